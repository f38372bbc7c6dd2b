//! 台股每日技术分析
//!
//! 抓取追踪清单的日线行情，计算 SMA / RSI / MACD / 成交量趋势 / 背离，
//! 生成买进 / 持有 / 卖出建议，输出快照 JSON 与每日归档；
//! 另提供 RESTful API 读取快照、即时分析与行情代理。
//! 数据来源：Yahoo Finance、台湾证券交易所 ISIN 清单

mod config;     // 配置
mod handlers;   // HTTP 请求处理器
mod indicators; // 技术指标
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use std::path::PathBuf;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::env;

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::middleware::ApiKeyMiddleware;
use crate::services::{updater, yahoo};

#[derive(Parser, Debug)]
#[command(name = "twstock-advisor")]
#[command(about = "台股每日技术分析与投资建议")]
#[command(version)]
struct Args {
    /// 配置文件路径（缺省时依序搜索 config.json、scripts/config.json、config/config.json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// 抓取行情、生成建议并写入快照（默认）
    Update,
    /// 启动 HTTP 服务
    Serve,
}

/// 命令行指定的路径优先，其次是默认位置，都没有则使用默认配置
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    match path.cloned().or_else(AppConfig::find_default_file) {
        Some(path) => {
            let config = AppConfig::from_file(&path)
                .with_context(|| format!("加载配置文件 {} 失败", path.display()))?;
            Ok((config, Some(path)))
        }
        None => Ok((AppConfig::default(), None)),
    }
}

/// 应用程序入口
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (mut config, source) = load_config(args.config.as_ref())?;

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    match &source {
        Some(path) => log::info!("从 {} 加载配置成功", path.display()),
        None => log::info!("使用默认配置"),
    }

    match args.command.unwrap_or(Command::Update) {
        Command::Update => {
            let summary = updater::run_update(&config).await.map_err(|e| {
                log::error!("❌ {}", e);
                e
            })?;
            if !summary.skipped.is_empty() {
                log::warn!("略過：{}", summary.skipped.join(", "));
            }
            Ok(())
        }
        Command::Serve => {
            // 环境变量中的 API Key 优先
            if let Ok(key) = env::var("API_KEY") {
                config.api.api_key = key;
            }
            if config.api.api_key.is_empty() {
                log::warn!("未设置 API Key，接口不启用认证");
            }

            let bind_addr = config.bind_addr();
            let workers = config.server.workers;
            let api_key = config.api.api_key.clone();
            let client = yahoo::build_client(config.fetch.timeout_secs)?;
            let state = web::Data::new(AppState::new(config, client));

            log::info!("启动台股分析服务: {}", bind_addr);

            let mut server = HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .wrap(ApiKeyMiddleware::new(api_key.clone()))  // API Key 认证
                    .wrap(Logger::default())  // 添加请求日志中间件
                    .configure(handlers::config)  // 配置路由
            });
            if workers > 0 {
                server = server.workers(workers);
            }
            server.bind(bind_addr)?.run().await?;
            Ok(())
        }
    }
}
