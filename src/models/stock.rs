//! 股票数据模型
//!
//! 定义指标、建议与输出快照的数据结构

use serde::{Deserialize, Serialize};
use std::fmt;

/// 操作建议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Hold => "hold",
            Action::Sell => "sell",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成交量趋势
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    #[default]
    Neutral,
}

/// RSI 背离状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Divergence {
    Bullish,
    Bearish,
    None,
}

/// 单只股票的技术指标集合
///
/// 历史长度不足时对应字段为 `None`，属于正常情况
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// 短期均线
    pub sma_short: Option<f64>,
    /// 中期均线
    pub sma_long: Option<f64>,
    /// 长期趋势均线（200 日）
    pub sma_trend: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub volume_trend: VolumeTrend,
    /// 历史不足 20 个对齐点时为 `None`
    pub divergence: Option<Divergence>,
}

/// 投资建议
///
/// 每个标的每次运行生成一次，生成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub reason: String,
    /// 置信度，[0, 1]，保留两位小数
    pub confidence: f64,
    /// 多信号模式下触发的信号列表（按触发顺序）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<String>>,
}

/// 单只股票的输出记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentReport {
    /// 股票代码（保留 .TW/.TWO 后缀）
    pub symbol: String,
    /// 显示名称
    pub name: String,
    /// 最新收盘价
    pub price: f64,
    /// 涨跌额
    pub change: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 最新成交量
    pub volume: u64,
    pub recommendation: Recommendation,
}

/// 单次运行的输出快照
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// 生成时间（ISO 8601，台北时间）
    pub updated_at: String,
    pub stocks: Vec<InstrumentReport>,
}

/// 已解析的日线序列
///
/// 收盘价和成交量按交易日排列，最新的在最后，允许空值
#[derive(Debug, Clone, Default)]
pub struct ChartSeries {
    pub symbol: String,
    /// 数据源提供的名称（longName / shortName）
    pub name: Option<String>,
    pub closes: Vec<Option<f64>>,
    pub volumes: Vec<Option<f64>>,
}
