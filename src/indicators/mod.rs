//! 技术指标
//!
//! 纯函数，无共享状态；历史不足时返回 `None` 而不是错误
//!
//! - 序列工具：最新有效值、SMA
//! - 动量：RSI、RSI 序列、背离
//! - MACD：EMA、MACD 线 / 信号线 / 柱状图
//! - 成交量趋势

mod macd;
mod momentum;
mod series;
mod volume;

pub use macd::macd;
pub use momentum::{divergence, rsi, rsi_series};
pub use series::{last_valid, round2, second_last_valid, sma, valid_values};
pub use volume::volume_trend;
