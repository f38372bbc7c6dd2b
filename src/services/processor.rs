//! 单只股票处理流程
//!
//! 收盘价 / 成交量序列 → 技术指标 → 投资建议 → 输出记录

use std::collections::HashMap;

use thiserror::Error;

use super::recommendation::RecommendationEngine;
use crate::config::{EngineMode, IndicatorConfig};
use crate::indicators::{
    divergence, last_valid, macd, round2, rsi, rsi_series, second_last_valid, sma, valid_values,
    volume_trend,
};
use crate::models::{IndicatorSet, InstrumentReport};

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// 整段序列没有任何有效收盘价
    #[error("{symbol} 無有效收盤價")]
    NoValidPrice { symbol: String },
}

/// 显示名称：名称映射 > 数据源名称 > 去掉市场后缀的代码
pub fn resolve_display_name(
    symbol: &str,
    name_map: &HashMap<String, String>,
    provider_name: Option<&str>,
) -> String {
    let usable = |name: &&str| !name.trim().is_empty();
    name_map
        .get(symbol)
        .map(String::as_str)
        .filter(usable)
        .or(provider_name.filter(usable))
        .map(str::to_string)
        .unwrap_or_else(|| symbol.split('.').next().unwrap_or(symbol).to_string())
}

/// 计算指标集合
///
/// 传统模式只需要短、中期均线与 RSI，其余字段保持为空
pub fn build_indicators(
    closes: &[Option<f64>],
    volumes: &[Option<f64>],
    cfg: &IndicatorConfig,
    mode: EngineMode,
) -> IndicatorSet {
    let mut indicators = IndicatorSet {
        sma_short: sma(closes, cfg.sma_short),
        sma_long: sma(closes, cfg.sma_long),
        rsi: rsi(closes, cfg.rsi_period),
        ..IndicatorSet::default()
    };

    if mode == EngineMode::Classic {
        return indicators;
    }

    let m = macd(closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
    indicators.sma_trend = sma(closes, cfg.sma_trend);
    indicators.macd_line = m.line;
    indicators.macd_signal = m.signal;
    indicators.macd_histogram = m.histogram;
    indicators.volume_trend = volume_trend(volumes);

    // RSI 序列与 prices[rsi_period..] 逐一对齐
    let prices = valid_values(closes);
    let rsi_values = rsi_series(&prices, cfg.rsi_period);
    indicators.divergence = if rsi_values.is_empty() {
        None
    } else {
        divergence(&prices[cfg.rsi_period..], &rsi_values)
    };

    indicators
}

/// 单只股票处理器
#[derive(Debug, Clone)]
pub struct InstrumentProcessor {
    indicators: IndicatorConfig,
    engine: RecommendationEngine,
}

impl InstrumentProcessor {
    pub fn new(indicators: IndicatorConfig, mode: EngineMode) -> Self {
        let engine = RecommendationEngine::new(mode, indicators.clone());
        Self { indicators, engine }
    }

    /// 生成一只股票的输出记录
    ///
    /// 没有任何有效收盘价时返回 [`AnalysisError::NoValidPrice`]，由调用方跳过该股票
    pub fn process(
        &self,
        symbol: &str,
        name: &str,
        closes: &[Option<f64>],
        volumes: &[Option<f64>],
    ) -> Result<InstrumentReport, AnalysisError> {
        let close = last_valid(closes).ok_or_else(|| AnalysisError::NoValidPrice {
            symbol: symbol.to_string(),
        })?;
        let prev_close = second_last_valid(closes).unwrap_or(close);

        let change = close - prev_close;
        let change_percent = if prev_close == 0.0 {
            0.0
        } else {
            change / prev_close * 100.0
        };

        let indicators = build_indicators(closes, volumes, &self.indicators, self.engine.mode());
        log::debug!("{} 指标: {:?}", symbol, indicators);
        let recommendation = self.engine.evaluate(&indicators);

        let volume = volumes
            .last()
            .copied()
            .flatten()
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v as u64)
            .unwrap_or(0);

        Ok(InstrumentReport {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price: round2(close),
            change: round2(change),
            change_percent: round2(change_percent),
            volume,
            recommendation,
        })
    }
}
