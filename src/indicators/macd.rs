//! 指数移动平均与 MACD

use super::series::valid_values;

/// MACD 计算结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Macd {
    /// 快线 EMA - 慢线 EMA
    pub line: Option<f64>,
    /// MACD 序列的 EMA
    pub signal: Option<f64>,
    /// MACD 线 - 信号线
    pub histogram: Option<f64>,
}

/// 指数移动平均序列
///
/// 平滑系数 `2 / (period + 1)`，以前 `period` 个值的简单平均作为初值。
/// 第 `k` 个结果对应 `values[period - 1 + k]`；数据不足时返回空序列。
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);
    let mut current = seed;
    for &value in &values[period..] {
        current = (value - current) * multiplier + current;
        result.push(current);
    }
    result
}

/// 整段序列的最终 EMA 值
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

/// MACD(fast, slow, signal)
///
/// - 有效价格少于 `slow` 个：三项皆为 `None`
/// - 少于 `slow + signal` 个：只有 MACD 线
/// - 信号线取自从第 `slow` 个索引起每个位置重新计算的 MACD 值序列
pub fn macd(series: &[Option<f64>], fast: usize, slow: usize, signal: usize) -> Macd {
    let values = valid_values(series);
    if fast == 0 || fast > slow || values.len() < slow {
        return Macd::default();
    }

    let fast_ema = ema_series(&values, fast);
    let slow_ema = ema_series(&values, slow);
    // 位置 i 的 MACD 值 = 截至 i 的快线 EMA - 截至 i 的慢线 EMA
    let macd_at = |i: usize| fast_ema[i + 1 - fast] - slow_ema[i + 1 - slow];

    let line = macd_at(values.len() - 1);

    if values.len() < slow + signal {
        return Macd {
            line: Some(line),
            signal: None,
            histogram: None,
        };
    }

    let history: Vec<f64> = (slow..values.len()).map(macd_at).collect();
    let signal_line = ema(&history, signal);

    Macd {
        line: Some(line),
        signal: signal_line,
        histogram: signal_line.map(|s| line - s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    /// 逐个前缀重新计算 EMA 的朴素版本，用于核对增量计算
    fn naive_macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64) {
        let line = ema(values, fast).unwrap() - ema(values, slow).unwrap();
        let history: Vec<f64> = (slow..values.len())
            .map(|i| ema(&values[..=i], fast).unwrap() - ema(&values[..=i], slow).unwrap())
            .collect();
        (line, ema(&history, signal).unwrap())
    }

    #[test]
    fn test_ema_seed_and_update() {
        let series = ema_series(&[1.0, 2.0, 3.0, 4.0], 3);
        // 初值 2.0，之后 (4 - 2) * 0.5 + 2 = 3
        assert_eq!(series, vec![2.0, 3.0]);
        assert_eq!(ema(&[1.0, 2.0], 3), None);
    }

    #[test]
    fn test_macd_insufficient_history() {
        let values: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        assert_eq!(macd(&closes(&values), 12, 26, 9), Macd::default());
    }

    #[test]
    fn test_macd_line_only() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = macd(&closes(&values), 12, 26, 9);
        assert!(result.line.is_some());
        assert_eq!(result.signal, None);
        assert_eq!(result.histogram, None);
    }

    #[test]
    fn test_macd_matches_prefix_recomputation() {
        println!("\n========== 测试 MACD 增量计算 ==========");
        let values: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.35).sin() * 8.0 + i as f64 * 0.2)
            .collect();

        let result = macd(&closes(&values), 12, 26, 9);
        let (line, signal) = naive_macd(&values, 12, 26, 9);
        println!("  MACD = {:.4}, signal = {:.4}", line, signal);

        assert!((result.line.unwrap() - line).abs() < 1e-9);
        assert!((result.signal.unwrap() - signal).abs() < 1e-9);
        assert!((result.histogram.unwrap() - (line - signal)).abs() < 1e-9);
        println!("✅ MACD 增量计算测试通过！");
    }

    #[test]
    fn test_macd_rising_trend_positive() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 2.0).collect();
        let result = macd(&closes(&values), 12, 26, 9);
        assert!(result.line.unwrap() > 0.0);
    }
}
