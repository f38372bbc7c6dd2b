//! 每日批次更新
//!
//! 1. 决定追踪清单（动态股票池或设定清单）
//! 2. 逐只抓取日线并生成建议（严格按顺序）
//! 3. 写入快照、归档与名称映射

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use reqwest::Client;

use super::processor::{resolve_display_name, InstrumentProcessor};
use super::{snapshot, twse, yahoo};
use crate::config::{AppConfig, OutputConfig};
use crate::models::{ChartSeries, InstrumentReport, Snapshot};

/// 批次统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub processed: usize,
    pub skipped: Vec<String>,
    pub written: Vec<PathBuf>,
}

/// 决定本次要处理的清单与名称映射
pub async fn resolve_watchlist(
    client: &Client,
    config: &AppConfig,
) -> (Vec<String>, HashMap<String, String>) {
    let universe = &config.universe;
    if universe.enabled {
        log::info!("🧭 使用 universe 設定，動態取得台股清單…");
        let (tickers, names) = twse::build_universe(client, universe).await;
        if !tickers.is_empty() {
            return (tickers, names);
        }
        log::warn!("⚠️ 動態清單取得失敗，回退使用 watchlist 設定");
        return (config.watchlist.clone(), HashMap::new());
    }

    let names = match twse::build_name_map(client).await {
        Ok(names) => names,
        Err(e) => {
            log::warn!("无法取得名称映射，改用代码作为名称: {}", e);
            HashMap::new()
        }
    };
    (config.watchlist.clone(), names)
}

/// 清单预览（最多 20 个）
fn preview(watchlist: &[String]) -> String {
    let mut text = watchlist.iter().take(20).cloned().collect::<Vec<_>>().join(", ");
    if watchlist.len() > 20 {
        text.push_str(" …");
    }
    text
}

/// 按顺序处理清单中的每只股票，单只失败只记录不中断
///
/// `fetch` 负责取得一只股票的日线序列，上一只处理完才会请求下一只
pub async fn collect_reports<F, Fut>(
    config: &AppConfig,
    watchlist: &[String],
    names: &HashMap<String, String>,
    mut fetch: F,
) -> (Vec<InstrumentReport>, Vec<String>)
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ChartSeries>>,
{
    let processor = InstrumentProcessor::new(config.indicators.clone(), config.engine);
    let mut stocks = Vec::new();
    let mut skipped = Vec::new();

    for symbol in watchlist {
        let result = match fetch(symbol.clone()).await {
            Ok(series) => {
                let name = resolve_display_name(symbol, names, series.name.as_deref());
                processor
                    .process(symbol, &name, &series.closes, &series.volumes)
                    .map_err(anyhow::Error::from)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                log::info!(
                    "✅ {}: ${:.2} ({:+.2}%) - {}",
                    symbol,
                    report.price,
                    report.change_percent,
                    report.recommendation.action.as_str().to_uppercase()
                );
                stocks.push(report);
            }
            Err(e) => {
                log::warn!("⚠️ {} 失敗：{}", symbol, e);
                skipped.push(symbol.clone());
            }
        }
    }

    (stocks, skipped)
}

/// 写入快照与当日归档；一只都没有成功时报错且不写入任何文件
pub fn save_reports(output: &OutputConfig, stocks: Vec<InstrumentReport>) -> Result<Vec<PathBuf>> {
    if stocks.is_empty() {
        return Err(anyhow!("沒有成功抓取任何股票資料"));
    }
    let snapshot: Snapshot = snapshot::build_snapshot(stocks);
    snapshot::write_snapshot(&snapshot, output)
}

/// 写入名称映射，失败只记录警告
fn try_write_names(names: &HashMap<String, String>, path: &Path) -> bool {
    match snapshot::write_names(names, path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("⚠️ 無法寫入名稱映射 {}：{}", path.display(), e);
            false
        }
    }
}

/// 执行一次完整更新
pub async fn run_update(config: &AppConfig) -> Result<UpdateSummary> {
    log::info!("🚀 開始更新股票資料…");
    let client = yahoo::build_client(config.fetch.timeout_secs)?;

    let (watchlist, names) = resolve_watchlist(&client, config).await;
    if watchlist.is_empty() {
        return Err(anyhow!("無追蹤清單，請設定 watchlist 或啟用 universe"));
    }
    log::info!("📋 追蹤股票（{}）：{}", watchlist.len(), preview(&watchlist));

    let (client_ref, fetch) = (&client, &config.fetch);
    let (stocks, skipped) = collect_reports(config, &watchlist, &names, move |symbol| async move {
        yahoo::fetch_chart(client_ref, &symbol, &fetch.range, &fetch.interval).await
    })
    .await;

    let processed = stocks.len();
    let mut written = save_reports(&config.output, stocks)?;

    // 名称映射写入失败不影响本次结果
    if config.output.write_names {
        let names_path = &config.output.names_path;
        match twse::build_name_map(&client).await {
            Ok(full) => {
                if try_write_names(&full, names_path) {
                    written.push(names_path.clone());
                }
            }
            Err(e) => log::warn!("⚠️ 無法輸出名稱映射：{}", e),
        }
    }

    log::info!("🎉 完成！成功更新 {} 檔股票，略過 {} 檔", processed, skipped.len());

    Ok(UpdateSummary {
        processed,
        skipped,
        written,
    })
}
