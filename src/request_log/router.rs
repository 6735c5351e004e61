//! 历史记录 / 统计 API 路由

use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::admin::{AdminState, admin_auth_middleware};

use super::handlers::{clear_history, get_history, get_stats};
use super::store::RequestLog;

/// 历史记录 API 状态
#[derive(Clone)]
pub struct RequestLogState {
    pub log: Arc<RequestLog>,
    pub history_delete_token: String,
}

/// 创建历史记录 / 统计路由
///
/// 所有端点都需要管理员 Bearer Token
pub fn create_request_log_router(
    admin: AdminState,
    log: Arc<RequestLog>,
    history_delete_token: impl Into<String>,
) -> Router {
    let state = RequestLogState {
        log,
        history_delete_token: history_delete_token.into(),
    };

    Router::new()
        .route("/history", get(get_history).delete(clear_history))
        .route("/stats", get(get_stats))
        .layer(middleware::from_fn_with_state(admin, admin_auth_middleware))
        .with_state(state)
}
