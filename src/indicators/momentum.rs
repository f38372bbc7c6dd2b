//! 动量指标
//!
//! - RSI（简单平均版本，取最近 `period` 个涨跌幅）
//! - RSI 序列（用于背离检测）
//! - RSI / 价格背离

use super::series::valid_values;
use crate::models::Divergence;

/// 背离检测所需的对齐点数
pub const DIVERGENCE_WINDOW: usize = 20;

/// 极值需要出现在窗口后半段（索引大于此值）才算近期新高/新低
const DIVERGENCE_RECENT_FROM: usize = 10;

/// RSI = 100 - 100 / (1 + 平均涨幅 / 平均跌幅)
///
/// 有效价格少于 `period + 1` 个时返回 `None`；平均跌幅为 0 时返回 100。
pub fn rsi(series: &[Option<f64>], period: usize) -> Option<f64> {
    let values = valid_values(series);
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let deltas = deltas(&values);
    Some(rsi_from_deltas(&deltas[deltas.len() - period..]))
}

/// 对每个可计算的位置求 RSI
///
/// 输入为已过滤空值的价格；第 `k` 个结果对应 `values[period + k]`，
/// 即结果与 `values[period..]` 逐一对齐。
pub fn rsi_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period + 1 {
        return Vec::new();
    }
    let deltas = deltas(values);
    (period..values.len())
        .map(|i| rsi_from_deltas(&deltas[i - period..i]))
        .collect()
}

fn deltas(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn rsi_from_deltas(window: &[f64]) -> f64 {
    let period = window.len() as f64;
    let avg_gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period;
    let avg_loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// RSI 背离检测
///
/// 取最近 20 组对齐的 (价格, RSI)：
/// - 牛市背离：价格最低点落在窗口后半段且创新低，但该点之后的 RSI 最低值
///   仍高于之前的 RSI 最低值
/// - 熊市背离：价格最高点落在窗口后半段且创新高，但该点之后的 RSI 最高值
///   仍低于之前的 RSI 最高值
///
/// 两者同时成立时以牛市背离为准（先判断先返回）。
/// 任一序列少于 20 个点时返回 `None`。
pub fn divergence(prices: &[f64], rsi_values: &[f64]) -> Option<Divergence> {
    if prices.len() < DIVERGENCE_WINDOW || rsi_values.len() < DIVERGENCE_WINDOW {
        return None;
    }

    let recent_prices = &prices[prices.len() - DIVERGENCE_WINDOW..];
    let recent_rsi = &rsi_values[rsi_values.len() - DIVERGENCE_WINDOW..];

    let low_idx = first_extreme_index(recent_prices, |candidate, best| candidate < best);
    if low_idx > DIVERGENCE_RECENT_FROM {
        let price_low = recent_prices[low_idx];
        let earlier_price_low = min_of(&recent_prices[..low_idx]);
        let earlier_rsi_low = min_of(&recent_rsi[..low_idx]);
        let later_rsi_low = min_of(&recent_rsi[low_idx..]);
        if price_low < earlier_price_low && later_rsi_low > earlier_rsi_low {
            return Some(Divergence::Bullish);
        }
    }

    let high_idx = first_extreme_index(recent_prices, |candidate, best| candidate > best);
    if high_idx > DIVERGENCE_RECENT_FROM {
        let price_high = recent_prices[high_idx];
        let earlier_price_high = max_of(&recent_prices[..high_idx]);
        let earlier_rsi_high = max_of(&recent_rsi[..high_idx]);
        let later_rsi_high = max_of(&recent_rsi[high_idx..]);
        if price_high > earlier_price_high && later_rsi_high < earlier_rsi_high {
            return Some(Divergence::Bearish);
        }
    }

    Some(Divergence::None)
}

/// 第一次出现极值的位置
fn first_extreme_index(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if better(value, values[best]) {
            best = i;
        }
    }
    best
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
