//! 成交量趋势

use crate::models::VolumeTrend;

/// 比较窗口长度
const WINDOW: usize = 5;
const INCREASING_RATIO: f64 = 1.2;
const DECREASING_RATIO: f64 = 0.8;

/// 最近 5 笔成交量均值与前 5 笔均值比较
///
/// 近期均值 > 1.2 倍为放量，< 0.8 倍为缩量，否则为中性。
/// 不足 10 笔或任一窗口全为空值时视为中性。
pub fn volume_trend(volumes: &[Option<f64>]) -> VolumeTrend {
    if volumes.len() < WINDOW * 2 {
        return VolumeTrend::Neutral;
    }

    let len = volumes.len();
    let recent = mean(&volumes[len - WINDOW..]);
    let earlier = mean(&volumes[len - WINDOW * 2..len - WINDOW]);

    match (recent, earlier) {
        (Some(recent), Some(earlier)) if recent > earlier * INCREASING_RATIO => {
            VolumeTrend::Increasing
        }
        (Some(recent), Some(earlier)) if recent < earlier * DECREASING_RATIO => {
            VolumeTrend::Decreasing
        }
        _ => VolumeTrend::Neutral,
    }
}

fn mean(window: &[Option<f64>]) -> Option<f64> {
    let valid: Vec<f64> = window.iter().flatten().copied().collect();
    if valid.is_empty() {
        return None;
    }
    Some(valid.iter().sum::<f64>() / valid.len() as f64)
}
