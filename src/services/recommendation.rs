//! 投资建议引擎
//!
//! 无状态规则级联。多信号模式下依序评估信号规则，每条触发的规则产生一个
//! [`Signal`]，按以下覆盖语义从左到右归约：
//!
//! - [`Precedence::Replace`]：无条件覆盖当前结论
//! - [`Precedence::KeepStrongerBuy`]：当前已是买入且置信度不低于阈值时保留当前结论
//!
//! 无论是否覆盖，触发规则的标签都会记入信号列表。没有任何信号触发时，
//! 退回传统的均线交叉 + RSI 规则（首个命中者生效）。传统模式直接使用后者。

use crate::config::{EngineMode, IndicatorConfig};
use crate::indicators::round2;
use crate::models::{Action, Divergence, IndicatorSet, Recommendation, VolumeTrend};

/// 顺势超卖的 RSI 上限
const TREND_OVERSOLD_RSI: f64 = 40.0;
/// MACD 交叉确认用的 RSI 中线
const RSI_MIDLINE: f64 = 50.0;
/// 金叉信号不覆盖置信度达到此值的既有买入结论
const STRONG_BUY_CONFIDENCE: f64 = 0.75;

const DEFAULT_REASON: &str = "價格持穩，建議續抱觀察";
const DEFAULT_CONFIDENCE: f64 = 0.50;

/// 单条规则给出的结论
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub action: Action,
    pub reason: String,
    pub confidence: f64,
}

impl Verdict {
    fn new(action: Action, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            action,
            reason: reason.into(),
            confidence,
        }
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::new(Action::Hold, DEFAULT_REASON, DEFAULT_CONFIDENCE)
    }
}

/// 覆盖语义
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precedence {
    Replace,
    KeepStrongerBuy(f64),
}

/// 信号规则的输出
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub label: &'static str,
    pub verdict: Verdict,
    pub precedence: Precedence,
}

impl Signal {
    fn replace(label: &'static str, verdict: Verdict) -> Self {
        Self {
            label,
            verdict,
            precedence: Precedence::Replace,
        }
    }

    /// 将本信号归约进当前结论
    pub fn apply(self, current: Verdict) -> Verdict {
        match self.precedence {
            Precedence::Replace => self.verdict,
            Precedence::KeepStrongerBuy(threshold) => {
                if current.action == Action::Buy && current.confidence >= threshold {
                    current
                } else {
                    self.verdict
                }
            }
        }
    }
}

type SignalRule = fn(&IndicatorSet) -> Option<Signal>;
type FallbackRule = fn(f64, f64, f64, &IndicatorConfig) -> Option<Verdict>;

/// 信号规则，按优先顺序排列
const SIGNAL_RULES: [SignalRule; 5] = [
    trend_oversold,
    macd_golden_cross,
    macd_death_cross,
    bullish_divergence,
    bearish_divergence,
];

/// 传统规则，首个命中者生效，最后一条总会命中
const FALLBACK_RULES: [FallbackRule; 6] = [
    golden_cross_oversold,
    death_cross_overbought,
    oversold_only,
    overbought_only,
    bullish_alignment,
    steady,
];

/// 建议引擎
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    mode: EngineMode,
    thresholds: IndicatorConfig,
}

impl RecommendationEngine {
    pub fn new(mode: EngineMode, thresholds: IndicatorConfig) -> Self {
        Self { mode, thresholds }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// 根据指标集合生成建议
    pub fn evaluate(&self, indicators: &IndicatorSet) -> Recommendation {
        match self.mode {
            EngineMode::Classic => {
                let verdict = fallback(indicators, &self.thresholds).unwrap_or_default();
                finish(verdict, None)
            }
            EngineMode::MultiSignal => {
                let (verdict, labels) = SIGNAL_RULES
                    .iter()
                    .filter_map(|rule| rule(indicators))
                    .fold((Verdict::default(), Vec::new()), |(current, mut labels), signal| {
                        labels.push(signal.label.to_string());
                        (signal.apply(current), labels)
                    });

                let verdict = if labels.is_empty() {
                    fallback(indicators, &self.thresholds).unwrap_or(verdict)
                } else {
                    verdict
                };
                finish(verdict, Some(labels))
            }
        }
    }
}

fn finish(verdict: Verdict, signals: Option<Vec<String>>) -> Recommendation {
    Recommendation {
        action: verdict.action,
        reason: verdict.reason,
        confidence: round2(verdict.confidence),
        signals,
    }
}

fn fmt_rsi(rsi: Option<f64>) -> String {
    rsi.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

// ==================== 信号规则 ====================

/// 中期均线站上 200 日均线且 RSI 偏低
fn trend_oversold(ind: &IndicatorSet) -> Option<Signal> {
    let (mid, long, rsi) = (ind.sma_long?, ind.sma_trend?, ind.rsi?);
    if mid > long && rsi < TREND_OVERSOLD_RSI {
        return Some(Signal::replace(
            "順勢超賣",
            Verdict::new(
                Action::Buy,
                format!("價格位於200日均線多頭趨勢，RSI {:.1} 顯示短期超賣，順勢買入良機", rsi),
                0.78,
            ),
        ));
    }
    None
}

fn macd_golden_cross(ind: &IndicatorSet) -> Option<Signal> {
    let (line, signal, histogram, rsi) =
        (ind.macd_line?, ind.macd_signal?, ind.macd_histogram?, ind.rsi?);
    if histogram > 0.0 && line > signal && rsi < RSI_MIDLINE {
        return Some(Signal {
            label: "MACD金叉+RSI偏低",
            verdict: Verdict::new(
                Action::Buy,
                format!("MACD黃金交叉且RSI {:.1} 偏低，趨勢轉強訊號明確", rsi),
                0.76,
            ),
            precedence: Precedence::KeepStrongerBuy(STRONG_BUY_CONFIDENCE),
        });
    }
    None
}

fn macd_death_cross(ind: &IndicatorSet) -> Option<Signal> {
    let (line, signal, histogram, rsi) =
        (ind.macd_line?, ind.macd_signal?, ind.macd_histogram?, ind.rsi?);
    if histogram < 0.0 && line < signal && rsi > RSI_MIDLINE {
        return Some(Signal::replace(
            "MACD死叉+RSI偏高",
            Verdict::new(
                Action::Sell,
                format!("MACD死亡交叉且RSI {:.1} 偏高，趨勢轉弱建議減碼", rsi),
                0.73,
            ),
        ));
    }
    None
}

fn bullish_divergence(ind: &IndicatorSet) -> Option<Signal> {
    if ind.divergence == Some(Divergence::Bullish) && ind.volume_trend == VolumeTrend::Increasing {
        return Some(Signal::replace(
            "牛市背離+量增",
            Verdict::new(
                Action::Buy,
                format!(
                    "RSI牛市背離且成交量放大，買盤進場趨勢反轉機率高 (RSI {})",
                    fmt_rsi(ind.rsi)
                ),
                0.80,
            ),
        ));
    }
    None
}

fn bearish_divergence(ind: &IndicatorSet) -> Option<Signal> {
    if ind.divergence == Some(Divergence::Bearish) && ind.volume_trend != VolumeTrend::Neutral {
        return Some(Signal::replace(
            "熊市背離",
            Verdict::new(
                Action::Sell,
                format!("RSI熊市背離，多頭動能減弱應留意 (RSI {})", fmt_rsi(ind.rsi)),
                0.75,
            ),
        ));
    }
    None
}

// ==================== 传统规则 ====================

/// 需要短、中期均线与 RSI 齐全，否则维持默认结论
fn fallback(ind: &IndicatorSet, cfg: &IndicatorConfig) -> Option<Verdict> {
    let (short, long, rsi) = (ind.sma_short?, ind.sma_long?, ind.rsi?);
    FALLBACK_RULES.iter().find_map(|rule| rule(short, long, rsi, cfg))
}

fn golden_cross_oversold(
    short: f64,
    long: f64,
    rsi: f64,
    cfg: &IndicatorConfig,
) -> Option<Verdict> {
    (short > long && rsi < cfg.rsi_oversold).then(|| {
        Verdict::new(
            Action::Buy,
            format!(
                "{}日均線黃金交叉{}日均線，RSI {:.1} 顯示超賣，建議逢低買進",
                cfg.sma_short, cfg.sma_long, rsi
            ),
            0.72,
        )
    })
}

fn death_cross_overbought(
    short: f64,
    long: f64,
    rsi: f64,
    cfg: &IndicatorConfig,
) -> Option<Verdict> {
    (short < long && rsi > cfg.rsi_overbought).then(|| {
        Verdict::new(
            Action::Sell,
            format!(
                "{}日均線跌破{}日均線，RSI {:.1} 超買，建議減碼",
                cfg.sma_short, cfg.sma_long, rsi
            ),
            0.68,
        )
    })
}

fn oversold_only(_short: f64, _long: f64, rsi: f64, cfg: &IndicatorConfig) -> Option<Verdict> {
    (rsi < cfg.rsi_oversold).then(|| {
        Verdict::new(Action::Buy, format!("RSI {:.1} 顯示超賣，有反彈機會", rsi), 0.63)
    })
}

fn overbought_only(_short: f64, _long: f64, rsi: f64, cfg: &IndicatorConfig) -> Option<Verdict> {
    (rsi > cfg.rsi_overbought).then(|| {
        Verdict::new(Action::Sell, format!("RSI {:.1} 超買，建議獲利了結", rsi), 0.58)
    })
}

fn bullish_alignment(short: f64, long: f64, _rsi: f64, _cfg: &IndicatorConfig) -> Option<Verdict> {
    (short > long).then(|| Verdict::new(Action::Hold, "均線呈多頭排列，價格穩健，建議續抱", 0.62))
}

fn steady(_short: f64, _long: f64, _rsi: f64, _cfg: &IndicatorConfig) -> Option<Verdict> {
    Some(Verdict::new(Action::Hold, "價格持穩於均線附近，靜待明確訊號", 0.52))
}
