//! 序列工具
//!
//! 原始行情允许空值（休市日或数据缺口），所有计算先过滤空值再取窗口，
//! 因此"最近 N 个值"指最近 N 个有效值，而不是最近 N 个日历日。

/// 过滤空值，保持原有时间顺序
pub fn valid_values(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().flatten().copied().collect()
}

/// 从最新一笔往回找第一个有效值
pub fn last_valid(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().next().copied()
}

/// 从最新一笔往回找第二个有效值
pub fn second_last_valid(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().nth(1).copied()
}

/// 简单移动平均：最近 `period` 个有效值的算术平均
pub fn sma(series: &[Option<f64>], period: usize) -> Option<f64> {
    sma_of(&valid_values(series), period)
}

fn sma_of(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
