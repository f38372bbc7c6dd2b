use actix_web::{web, HttpResponse, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::models::{ApiResponse, InstrumentReport, Snapshot};
use crate::services::processor::{resolve_display_name, InstrumentProcessor};
use crate::services::{snapshot, yahoo};

/// 代理接口使用的历史区间
const PROXY_RANGE: &str = "1mo";
const PROXY_INTERVAL: &str = "1d";

/// 服务共享状态
pub struct AppState {
    pub config: AppConfig,
    pub client: Client,
    pub processor: InstrumentProcessor,
}

impl AppState {
    pub fn new(config: AppConfig, client: Client) -> Self {
        let processor = InstrumentProcessor::new(config.indicators.clone(), config.engine);
        Self {
            config,
            client,
            processor,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub symbol: Option<String>,
}

/// 待尝试的完整代码：已有后缀则原样使用，否则先 .TW 再 .TWO
pub fn candidate_symbols(symbol: &str) -> Vec<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.contains('.') {
        vec![symbol]
    } else {
        vec![format!("{}.TW", symbol), format!("{}.TWO", symbol)]
    }
}

/// Yahoo Chart 代理，避免前端跨域问题
pub async fn proxy_chart(
    state: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> Result<HttpResponse> {
    let symbol = match query.symbol.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            return Ok(HttpResponse::BadRequest()
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .json(ApiResponse::<()>::error("Missing symbol parameter")))
        }
    };

    match yahoo::fetch_raw_chart(&state.client, &symbol, PROXY_RANGE, PROXY_INTERVAL).await {
        Ok(data) => Ok(HttpResponse::Ok()
            .insert_header(("Access-Control-Allow-Origin", "*"))
            .json(data)),
        Err(e) => {
            log::error!("代理 {} 失败: {}", symbol, e);
            Ok(HttpResponse::BadGateway()
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .json(ApiResponse::<()>::error(e.to_string())))
        }
    }
}

/// 即时抓取并分析单只股票
pub async fn live_analysis(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let names = snapshot::load_names(&state.config.output.names_path);
    let fetch = &state.config.fetch;
    let mut last_error = String::from("股票不存在或無法取得資料");

    for symbol in candidate_symbols(&path.into_inner()) {
        let fetched =
            yahoo::fetch_chart(&state.client, &symbol, &fetch.range, &fetch.interval).await;
        let series = match fetched {
            Ok(series) => series,
            Err(e) => {
                log::debug!("{} 抓取失败: {}", symbol, e);
                last_error = e.to_string();
                continue;
            }
        };

        let name = resolve_display_name(&symbol, &names, series.name.as_deref());
        match state.processor.process(&symbol, &name, &series.closes, &series.volumes) {
            Ok(report) => return Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
            Err(e) => last_error = e.to_string(),
        }
    }

    Ok(HttpResponse::NotFound().json(ApiResponse::<InstrumentReport>::error(last_error)))
}

/// 最新快照
pub async fn latest_snapshot(state: web::Data<AppState>) -> Result<HttpResponse> {
    match snapshot::load_snapshot(&state.config.output.data_path) {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(HttpResponse::NotFound().json(ApiResponse::<Snapshot>::error(e.to_string()))),
    }
}

/// 指定日期的归档快照
pub async fn history_snapshot(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let date = path.into_inner();
    let valid = Regex::new(r"^\d{4}-\d{2}-\d{2}$")
        .map(|re| re.is_match(&date))
        .unwrap_or(false);
    if !valid {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<Snapshot>::error(format!("日期格式错误: {}", date))));
    }

    let file = snapshot::history_path(&state.config.output.history_dir, &date);
    match snapshot::load_snapshot(&file) {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(HttpResponse::NotFound().json(ApiResponse::<Snapshot>::error(e.to_string()))),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stock", web::get().to(proxy_chart))
        .route("/snapshot", web::get().to(latest_snapshot))
        .route("/history/{date}", web::get().to(history_snapshot))
        .service(web::scope("/stocks").route("/{symbol}/live", web::get().to(live_analysis)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::snapshot::{build_snapshot, write_snapshot};
    use actix_web::{test, App};

    fn state_with_output(dir: &std::path::Path) -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.output.data_path = dir.join("data.json");
        config.output.history_dir = dir.join("history");
        config.output.names_path = dir.join("names.json");
        web::Data::new(AppState::new(config, Client::new()))
    }

    #[actix_web::test]
    async fn test_candidate_symbols() {
        assert_eq!(candidate_symbols("2330"), vec!["2330.TW", "2330.TWO"]);
        assert_eq!(candidate_symbols(" 6547.two "), vec!["6547.TWO"]);
    }

    #[actix_web::test]
    async fn test_proxy_requires_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state_with_output(dir.path()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/stock").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[actix_web::test]
    async fn test_snapshot_endpoints() {
        println!("\n========== 测试快照接口 ==========");
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_output(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/snapshot").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        write_snapshot(&build_snapshot(Vec::new()), &state.config.output).unwrap();

        let req = test::TestRequest::get().uri("/snapshot").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert!(body["data"]["stocks"].as_array().unwrap().is_empty());

        let today = snapshot::taipei_now().format("%Y-%m-%d").to_string();
        let req = test::TestRequest::get()
            .uri(&format!("/history/{}", today))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let req = test::TestRequest::get().uri("/history/1999-01-01").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let req = test::TestRequest::get().uri("/history/latest").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        println!("✅ 快照接口测试通过！");
    }
}
