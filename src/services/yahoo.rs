//! Yahoo Finance 日线接口
//!
//! 对接 https://query1.finance.yahoo.com/v8/finance/chart/<symbol>

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::models::ChartSeries;

/// Yahoo Finance Chart API
pub const YF_CHART_API: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome Safari";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// 创建带超时的 HTTP 客户端
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("创建 HTTP 客户端失败")
}

fn chart_url(symbol: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(symbol.as_bytes()).collect();
    format!("{}/{}", YF_CHART_API, encoded)
}

/// 获取原始 Chart JSON（供代理接口直接转发）
pub async fn fetch_raw_chart(
    client: &Client,
    symbol: &str,
    range: &str,
    interval: &str,
) -> Result<serde_json::Value> {
    let response = client
        .get(chart_url(symbol))
        .query(&[("range", range), ("interval", interval)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("获取 {} 行情失败: {}", symbol, response.status()));
    }

    Ok(response.json().await?)
}

/// 获取并解析日线序列
pub async fn fetch_chart(
    client: &Client,
    symbol: &str,
    range: &str,
    interval: &str,
) -> Result<ChartSeries> {
    let response = client
        .get(chart_url(symbol))
        .query(&[("range", range), ("interval", interval)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("获取 {} 行情失败: {}", symbol, response.status()));
    }

    let text = response.text().await?;
    parse_chart(&text, symbol)
}

/// 解析 Chart JSON，取第一组结果的收盘价与成交量
pub fn parse_chart(data: &str, symbol: &str) -> Result<ChartSeries> {
    let envelope: ChartEnvelope =
        serde_json::from_str(data).with_context(|| format!("{} 行情 JSON 解析失败", symbol))?;

    if let Some(err) = envelope.chart.error {
        return Err(anyhow!(
            "{} 抓取失败: {} {}",
            symbol,
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        ));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| anyhow!("{} 抓取失败", symbol))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    Ok(ChartSeries {
        symbol: symbol.to_string(),
        name: result.meta.long_name.or(result.meta.short_name),
        closes: quote.close,
        volumes: quote.volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart() {
        println!("\n========== 测试解析 Chart 数据 ==========");
        let mock = r#"{"chart":{"result":[{
            "meta":{"symbol":"2330.TW","longName":"Taiwan Semiconductor Manufacturing Company Limited","regularMarketPrice":612.0},
            "timestamp":[1,2,3,4],
            "indicators":{"quote":[{"close":[600.0,null,605.0,612.0],"volume":[21000000,null,18000000,25000000],"open":[1,2,3,4]}]}
        }],"error":null}}"#;

        let series = parse_chart(mock, "2330.TW").unwrap();
        println!("  {:?}", series);
        assert_eq!(series.symbol, "2330.TW");
        assert_eq!(
            series.name.as_deref(),
            Some("Taiwan Semiconductor Manufacturing Company Limited")
        );
        assert_eq!(series.closes, vec![Some(600.0), None, Some(605.0), Some(612.0)]);
        assert_eq!(series.volumes[3], Some(25_000_000.0));
        println!("✅ Chart 数据解析测试通过！");
    }

    #[test]
    fn test_parse_chart_without_result() {
        let mock = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(mock, "9999.TW").unwrap_err();
        assert!(err.to_string().contains("Not Found"));

        let empty = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse_chart(empty, "9999.TW").is_err());
    }

    #[test]
    fn test_parse_chart_without_quotes() {
        let mock = r#"{"chart":{"result":[{"meta":{"shortName":"TSMC"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let series = parse_chart(mock, "2330.TW").unwrap();
        assert_eq!(series.name.as_deref(), Some("TSMC"));
        assert!(series.closes.is_empty());
        assert!(series.volumes.is_empty());
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        assert_eq!(chart_url("2330.TW"), format!("{}/2330.TW", YF_CHART_API));
        assert_eq!(chart_url("^TWII"), format!("{}/%5ETWII", YF_CHART_API));
    }
}
