//! API Key 认证中间件
//!
//! 通过 Header 中的 Authorization: Bearer <token> 进行认证。
//! 未设置 API Key 时不启用认证；健康检查与 CORS 预检请求一律放行。

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::models::ApiResponse;

/// API Key 中间件
pub struct ApiKeyMiddleware {
    api_key: Rc<Option<String>>,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: String) -> Self {
        let api_key = Some(api_key).filter(|key| !key.is_empty());
        Self {
            api_key: Rc::new(api_key),
        }
    }
}

/// 是否无需认证
fn is_exempt(req: &ServiceRequest) -> bool {
    req.method() == Method::OPTIONS || req.path().ends_with("/health")
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ApiKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyMiddlewareService {
            service: Rc::new(service),
            api_key: self.api_key.clone(),
        })
    }
}

pub struct ApiKeyMiddlewareService<S> {
    service: Rc<S>,
    api_key: Rc<Option<String>>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let api_key = self.api_key.clone();

        Box::pin(async move {
            let expected = match api_key.as_deref() {
                Some(key) if !is_exempt(&req) => key,
                _ => {
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
            };

            let provided_key = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));

            if provided_key == Some(expected) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            log::warn!("拒绝未授权请求: {} {}", req.method(), req.path());
            let response = HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("无效的 Bearer Token"));
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_bearer_token_required() {
        println!("\n========== 测试 API Key 认证 ==========");
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyMiddleware::new("secret".to_string()))
                .route("/api/v1/health", web::get().to(ok_handler))
                .route("/api/v1/snapshot", web::get().to(ok_handler))
                .route("/api/v1/snapshot", web::method(Method::OPTIONS).to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/snapshot").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/v1/snapshot")
            .insert_header(("Authorization", "Bearer wrong"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/v1/snapshot")
            .insert_header(("Authorization", "Bearer secret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/v1/snapshot")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        println!("✅ API Key 认证测试通过！");
    }

    #[actix_web::test]
    async fn test_empty_key_disables_auth() {
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyMiddleware::new(String::new()))
                .route("/api/v1/snapshot", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/snapshot").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}
