//! Admin 认证路由配置

use axum::{Router, routing::post};

use super::{auth_handlers::login, middleware::AdminState};

/// 创建认证路由
///
/// # 端点
/// - `POST /auth/login` - 用户名/密码表单登录，返回 Bearer Token
pub fn create_auth_router(state: AdminState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .with_state(state)
}
