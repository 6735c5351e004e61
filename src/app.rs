//! 路由组装

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::cors::{Any, CorsLayer};

use crate::admin::{AdminState, JwtManager, create_auth_router};
use crate::forward::{ForwardState, create_forward_router};
use crate::generation::GenerationBackend;
use crate::model::config::Config;
use crate::request_log::{RequestLog, create_request_log_router};

/// 创建完整的应用路由
///
/// # 端点
/// - `POST /forward` - 图像生成转发（无需认证）
/// - `POST /auth/login` - 管理员登录
/// - `GET|DELETE /history`、`GET /stats` - 需要管理员 Bearer Token
pub fn create_app(
    config: &Config,
    log: Arc<RequestLog>,
    backend: Arc<dyn GenerationBackend>,
) -> anyhow::Result<Router> {
    let jwt = JwtManager::new(
        &config.jwt_secret,
        config.jwt_algorithm()?,
        config.access_token_expire_minutes,
    )?;
    let admin = AdminState::new(jwt, &config.admin_user, &config.admin_pass);

    Ok(Router::new()
        .merge(create_auth_router(admin.clone()))
        .merge(create_request_log_router(
            admin,
            log.clone(),
            &config.history_delete_token,
        ))
        .merge(create_forward_router(ForwardState::new(backend, log)))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer()))
}

/// CORS：允许任意来源、方法和请求头
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use jsonwebtoken::Algorithm;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::generation::DummyBackend;
    use crate::request_log::SqliteRequestStore;

    const CONFIRM_TOKEN: &str = "wipe-it";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.jwt_secret = "test-secret".to_string();
        config.admin_user = "admin".to_string();
        config.admin_pass = "hunter2".to_string();
        config.history_delete_token = CONFIRM_TOKEN.to_string();
        config.use_dummy_model = true;
        config
    }

    fn setup() -> (Router, Arc<RequestLog>) {
        setup_with(test_config())
    }

    fn setup_with(config: Config) -> (Router, Arc<RequestLog>) {
        let log = Arc::new(RequestLog::new(Arc::new(
            SqliteRequestStore::open(":memory:").unwrap(),
        )));
        let app = create_app(&config, log.clone(), Arc::new(DummyBackend::new())).unwrap();
        (app, log)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, username: &str, password: &str) -> Response {
        let request = Request::post("/auth/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={}&password={}",
                username, password
            )))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn admin_token(app: &Router) -> String {
        let response = login(app, "admin", "hunter2").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["token_type"], "bearer");
        assert!(body["expires_in"].as_u64().unwrap() > 0);
        body["access_token"].as_str().unwrap().to_string()
    }

    fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
    }

    async fn generate(app: &Router, count: usize) {
        for _ in 0..count {
            let request = Request::post("/forward")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt": "tiny test", "width": 16, "height": 24}"#))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (app, _) = setup();
        let response = login(&app, "admin", "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_history_requires_token() {
        let (app, _) = setup();
        let response = app
            .clone()
            .oneshot(Request::get("/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(authed("GET", "/stats", "garbage").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_admin_role_is_forbidden() {
        let config = test_config();
        let jwt = JwtManager::new(&config.jwt_secret, Algorithm::HS256, 10).unwrap();
        let (token, _) = jwt.generate_token("viewer", "user").unwrap();
        let (app, _) = setup_with(config);

        let response = app
            .oneshot(authed("GET", "/history", &token).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "admin only");
    }

    #[tokio::test]
    async fn test_history_lists_forward_records() {
        let (app, _) = setup();
        generate(&app, 3).await;
        let token = admin_token(&app).await;

        let response = app
            .oneshot(authed("GET", "/history", &token).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 3);
        let first = &records[0];
        let second = &records[1];
        assert!(first["id"].as_i64().unwrap() > second["id"].as_i64().unwrap());
        assert_eq!(first["endpoint"], "/forward");
        assert_eq!(first["mode"], "t2i");
        assert_eq!(first["input_type"], "json");
        assert_eq!(first["image_w"], 16);
        assert_eq!(first["image_h"], 24);
        assert_eq!(first["status_code"], 200);
        assert!(first["error"].is_null());
        assert!(first["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, _) = setup();
        let token = admin_token(&app).await;

        let response = app
            .clone()
            .oneshot(authed("GET", "/stats", &token).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["count_total"], 0);
        assert!(body["latency_ms"].is_null());

        generate(&app, 4).await;
        let response = app
            .oneshot(authed("GET", "/stats", &token).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count_total"], 4);
        assert_eq!(body["count_ok"], 4);
        assert_eq!(body["prompt_len_chars"]["p50"], 9.0);
        assert_eq!(body["token_count"]["mean"], 2.0);
        assert_eq!(body["image_w"]["p99"], 16.0);
        assert!(body["latency_ms"]["mean"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_clear_history_with_wrong_token_keeps_records() {
        let (app, log) = setup();
        generate(&app, 2).await;
        let token = admin_token(&app).await;

        for confirm in [None, Some("nope")] {
            let mut builder = authed("DELETE", "/history", &token);
            if let Some(c) = confirm {
                builder = builder.header("x-confirm-token", c);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], b"forbidden");
        }

        assert_eq!(log.history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_with_confirm_token() {
        let (app, log) = setup();
        generate(&app, 5).await;
        let token = admin_token(&app).await;

        let response = app
            .clone()
            .oneshot(
                authed("DELETE", "/history", &token)
                    .header("x-confirm-token", CONFIRM_TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ok"], true);
        assert!(log.history().await.unwrap().is_empty());

        // 清空后新请求照常记录
        generate(&app, 1).await;
        assert_eq!(log.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_body_limit_rejects_oversized_upload() {
        let mut config = test_config();
        config.max_body_bytes = 64;
        let (app, log) = setup_with(config);

        let prompt = "p".repeat(500);
        let request = Request::post("/forward")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"prompt": "{}"}}"#, prompt)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let records = log.history().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status_code, 400);
    }

    #[test]
    fn test_create_app_rejects_overflowing_token_expiry() {
        let mut config = test_config();
        config.access_token_expire_minutes = u64::MAX / 30;
        let log = Arc::new(RequestLog::new(Arc::new(
            SqliteRequestStore::open(":memory:").unwrap(),
        )));
        assert!(create_app(&config, log, Arc::new(DummyBackend::new())).is_err());
    }

    #[test]
    fn test_create_app_rejects_non_hmac_alg() {
        let mut config = test_config();
        config.jwt_alg = "RS256".to_string();
        let log = Arc::new(RequestLog::new(Arc::new(
            SqliteRequestStore::open(":memory:").unwrap(),
        )));
        assert!(create_app(&config, log, Arc::new(DummyBackend::new())).is_err());
    }
}
