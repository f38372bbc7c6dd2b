//! 台湾证券交易所 ISIN 清单
//!
//! 抓取上市 / 上柜证券列表，构建动态股票池与代码→中文名称映射
//! 数据来源: https://isin.twse.com.tw/isin/C_public.jsp?strMode=<2|4>

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::UniverseConfig;

/// ISIN 公开查询页面
pub const TWSE_ISIN_URL: &str = "https://isin.twse.com.tw/isin/C_public.jsp";

/// 表头关键字
const HEADER_KEYWORD: &str = "有價證券代號";
/// ETF / 受益凭证的产业别
const BENEFICIARY_INDUSTRY: &str = "受益證券";

/// 市场别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    /// 上市
    Listed,
    /// 上柜
    Otc,
}

impl Market {
    pub fn mode(&self) -> u8 {
        match self {
            Market::Listed => 2,
            Market::Otc => 4,
        }
    }

    /// Yahoo 代码后缀
    pub fn suffix(&self) -> &'static str {
        match self {
            Market::Listed => ".TW",
            Market::Otc => ".TWO",
        }
    }
}

/// ISIN 表格中的一行
///
/// 栏位顺序：代号及名称、ISIN、上市日、市场别、产业别、CFICode、备注
#[derive(Debug, Clone, PartialEq)]
pub struct IsinRow {
    pub code: String,
    pub name: String,
    pub industry: String,
}

impl IsinRow {
    fn from_cells(cells: &[String]) -> Option<Self> {
        let (code, name) = split_code_name(&cells[0])?;
        Some(Self {
            code,
            name,
            industry: cells.get(4).cloned().unwrap_or_default(),
        })
    }

    pub fn symbol(&self, market: Market) -> String {
        format!("{}{}", self.code, market.suffix())
    }
}

/// 拆分 "2330　台積電" 为代码与名称，名称缺失时以代码代替
pub fn split_code_name(cell: &str) -> Option<(String, String)> {
    let cell = cell.trim();
    let code = cell.split_whitespace().next()?.to_string();
    let name = cell[cell.find(&code).unwrap_or(0) + code.len()..].trim();
    let name = if name.is_empty() { code.clone() } else { name.to_string() };
    Some((code, name))
}

/// 是否为要收录的代码
///
/// - 一般股票：4 码纯数字
/// - ETF / ETN：纯数字且以 00 或 02 开头
/// - 其余纯数字代码只在产业别为「受益證券」时收录
/// - 含字母的代码（权证、牛熊证等）一律排除
pub fn is_allowed_security(code: &str, industry: &str) -> bool {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if code.len() == 4 || code.starts_with("00") || code.starts_with("02") {
        return true;
    }
    industry == BENEFICIARY_INDUSTRY
}

/// 解码页面内容
///
/// 依序尝试 UTF-8 与 Big5，取第一个能解出表格内容的结果，最后退回有损 UTF-8
pub fn decode_listing(bytes: &[u8]) -> String {
    let looks_like_listing =
        |text: &str| text.to_lowercase().contains("<table") || text.contains(HEADER_KEYWORD);

    if let Ok(text) = std::str::from_utf8(bytes) {
        if looks_like_listing(text) {
            return text.to_string();
        }
    }

    let big5 = encoding_rs::BIG5.decode_without_bom_handling_and_without_replacement(bytes);
    if let Some(text) = big5 {
        if looks_like_listing(text.as_ref()) {
            return text.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// 解析 ISIN 页面，保留至少 5 栏且非表头的行
pub fn parse_isin_rows(html: &str) -> Result<Vec<IsinRow>> {
    let document = Html::parse_document(html);
    let tr_selector = Selector::parse("tr").map_err(|e| anyhow!("选择器解析失败: {:?}", e))?;
    let td_selector = Selector::parse("td").map_err(|e| anyhow!("选择器解析失败: {:?}", e))?;

    let rows = document
        .select(&tr_selector)
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&td_selector)
                .map(|cell| cell.text().collect::<Vec<_>>().join("").trim().to_string())
                .collect();

            if cells.len() < 5 || cells[0].contains(HEADER_KEYWORD) {
                return None;
            }
            IsinRow::from_cells(&cells)
        })
        .collect();

    Ok(rows)
}

/// 抓取某个市场的 ISIN 列表
pub async fn fetch_isin_rows(client: &Client, market: Market) -> Result<Vec<IsinRow>> {
    let response = client
        .get(TWSE_ISIN_URL)
        .query(&[("strMode", market.mode().to_string())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("获取 ISIN 清单失败: {}", response.status()));
    }

    let bytes = response.bytes().await?;
    let html = decode_listing(&bytes);
    let rows = parse_isin_rows(&html)?;
    log::debug!("ISIN strMode={} 共 {} 行", market.mode(), rows.len());
    Ok(rows)
}

/// 按股票池设定筛选一个市场的代码，追加到清单与名称映射
pub fn select_rows(
    rows: &[IsinRow],
    market: Market,
    options: &UniverseConfig,
    tickers: &mut Vec<String>,
    names: &mut HashMap<String, String>,
) {
    for row in rows {
        if !is_allowed_security(&row.code, &row.industry) {
            continue;
        }

        let is_etf = row.industry == BENEFICIARY_INDUSTRY;
        let admitted = (options.include_etf && is_etf)
            || options.include_all_sectors
            || options.include_sectors.iter().any(|s| s == &row.industry);

        if admitted {
            let symbol = row.symbol(market);
            names.insert(symbol.clone(), row.name.clone());
            tickers.push(symbol);
        }
    }
}

/// 构建动态股票池
///
/// 抓取失败时返回空清单，由调用方退回设定的追踪清单
pub async fn build_universe(
    client: &Client,
    options: &UniverseConfig,
) -> (Vec<String>, HashMap<String, String>) {
    let mut markets = vec![Market::Listed];
    if options.include_otc {
        markets.push(Market::Otc);
    }

    let mut tickers = Vec::new();
    let mut names = HashMap::new();

    for market in markets {
        match fetch_isin_rows(client, market).await {
            Ok(rows) => select_rows(&rows, market, options, &mut tickers, &mut names),
            Err(e) => {
                log::warn!("⚠️ 取得台股清單失敗：{}", e);
                return (Vec::new(), HashMap::new());
            }
        }
    }

    tickers.sort();
    tickers.dedup();
    (tickers, names)
}

/// 一个市场的代码→名称映射
pub fn name_entries(
    rows: &[IsinRow],
    market: Market,
) -> impl Iterator<Item = (String, String)> + '_ {
    rows.iter()
        .filter(|row| is_allowed_security(&row.code, &row.industry))
        .map(move |row| (row.symbol(market), row.name.clone()))
}

/// 全市场（上市 + 上柜）名称映射
pub async fn build_name_map(client: &Client) -> Result<HashMap<String, String>> {
    let mut names = HashMap::new();
    for market in [Market::Listed, Market::Otc] {
        let rows = fetch_isin_rows(client, market).await?;
        names.extend(name_entries(&rows, market));
    }
    Ok(names)
}
