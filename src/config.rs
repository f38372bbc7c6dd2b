//! 配置模块
//!
//! 支持从 JSON 文件加载追踪清单、指标参数与服务配置

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 动态股票池配置（台股上市/上柜清单）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseConfig {
    /// 是否启用动态清单
    #[serde(default)]
    pub enabled: bool,
    /// 是否包含上柜（.TWO）
    #[serde(default = "default_true", rename = "includeOTC")]
    pub include_otc: bool,
    /// 是否包含 ETF（产业别为「受益證券」）
    #[serde(default, rename = "includeETF")]
    pub include_etf: bool,
    /// 忽略产业白名单，收录所有产业
    #[serde(default)]
    pub include_all_sectors: bool,
    /// 产业别白名单
    #[serde(default)]
    pub include_sectors: Vec<String>,
}

/// 技术指标参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
    /// 长期趋势均线周期
    #[serde(default = "default_sma_trend")]
    pub sma_trend: usize,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// RSI 超卖阈值
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    /// RSI 超买阈值
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
}

/// 建议引擎模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// 仅使用均线交叉 + RSI 的传统规则
    #[default]
    Classic,
    /// 趋势、MACD、背离与成交量的多信号规则，无信号时退回传统规则
    MultiSignal,
}

/// 输出路径配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 最新快照
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// 每日归档目录
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    /// 全市场名称映射
    #[serde(default = "default_names_path")]
    pub names_path: PathBuf,
    #[serde(default = "default_true")]
    pub write_names: bool,
}

/// 行情抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// 历史区间，如 3mo / 1y
    #[serde(default = "default_range")]
    pub range: String,
    /// K 线周期
    #[serde(default = "default_interval")]
    pub interval: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 追踪清单（Yahoo 代码，如 2330.TW）
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub engine: EngineMode,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_true() -> bool { true }
fn default_watchlist() -> Vec<String> {
    vec!["2330.TW".to_string(), "2317.TW".to_string(), "2454.TW".to_string()]
}
fn default_sma_short() -> usize { 5 }
fn default_sma_long() -> usize { 20 }
fn default_sma_trend() -> usize { 200 }
fn default_rsi_period() -> usize { 14 }
fn default_rsi_oversold() -> f64 { 30.0 }
fn default_rsi_overbought() -> f64 { 70.0 }
fn default_macd_fast() -> usize { 12 }
fn default_macd_slow() -> usize { 26 }
fn default_macd_signal() -> usize { 9 }
fn default_data_path() -> PathBuf { PathBuf::from("public/data.json") }
fn default_history_dir() -> PathBuf { PathBuf::from("history") }
fn default_names_path() -> PathBuf { PathBuf::from("public/names.json") }
fn default_range() -> String { "3mo".to_string() }
fn default_interval() -> String { "1d".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_log_level() -> String { "info".to_string() }

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            include_otc: true,
            include_etf: false,
            include_all_sectors: false,
            include_sectors: Vec::new(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
            sma_trend: default_sma_trend(),
            rsi_period: default_rsi_period(),
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            history_dir: default_history_dir(),
            names_path: default_names_path(),
            write_names: true,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            range: default_range(),
            interval: default_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
            universe: UniverseConfig::default(),
            indicators: IndicatorConfig::default(),
            engine: EngineMode::default(),
            output: OutputConfig::default(),
            fetch: FetchConfig::default(),
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 按顺序搜索默认位置的配置文件
    pub fn find_default_file() -> Option<PathBuf> {
        ["config.json", "scripts/config.json", "config/config.json"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_style_config() {
        println!("\n========== 测试解析配置文件 ==========");
        let json = r#"{
            "watchlist": ["2330.TW", "0050.TW"],
            "universe": { "enabled": true, "includeOTC": false, "includeETF": true, "includeSectors": ["半導體業"] },
            "indicators": { "sma_short": 5, "sma_long": 20, "rsi_period": 14, "rsi_oversold": 25, "rsi_overbought": 75 },
            "engine": "multi_signal"
        }"#;

        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.watchlist, vec!["2330.TW", "0050.TW"]);
        assert!(config.universe.enabled);
        assert!(!config.universe.include_otc);
        assert!(config.universe.include_etf);
        assert_eq!(config.universe.include_sectors, vec!["半導體業"]);
        assert_eq!(config.indicators.rsi_oversold, 25.0);
        assert_eq!(config.indicators.sma_trend, 200);
        assert_eq!(config.indicators.macd_slow, 26);
        assert_eq!(config.engine, EngineMode::MultiSignal);
        assert_eq!(config.output.data_path, PathBuf::from("public/data.json"));
        println!("✅ 配置解析测试通过！");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.engine, EngineMode::Classic);
        assert_eq!(config.indicators.rsi_period, 14);
        assert!(config.universe.include_otc);
        assert_eq!(config.fetch.range, "3mo");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
