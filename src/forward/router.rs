//! 转发端点路由

use std::sync::Arc;

use axum::{Router, routing::post};

use super::handlers::forward;
use crate::generation::GenerationBackend;
use crate::request_log::RequestLog;
use crate::request_log::model::FORWARD_ENDPOINT;

/// 转发端点共享状态
#[derive(Clone)]
pub struct ForwardState {
    /// 启动时构建的生成后端
    pub backend: Arc<dyn GenerationBackend>,
    pub log: Arc<RequestLog>,
}

impl ForwardState {
    pub fn new(backend: Arc<dyn GenerationBackend>, log: Arc<RequestLog>) -> Self {
        Self { backend, log }
    }
}

/// 创建转发路由
///
/// # 端点
/// - `POST /forward` - JSON 文生图或 multipart 图生图
pub fn create_forward_router(state: ForwardState) -> Router {
    Router::new()
        .route(FORWARD_ENDPOINT, post(forward))
        .with_state(state)
}
