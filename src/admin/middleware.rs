//! Admin API 中间件

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use super::jwt::{ADMIN_ROLE, JwtManager};
use super::types::AdminErrorResponse;
use crate::common::auth;

/// Admin API 共享状态
#[derive(Clone)]
pub struct AdminState {
    /// JWT 管理器
    pub jwt: JwtManager,
    /// 管理员用户名
    pub admin_user: String,
    /// 管理员密码（明文或 bcrypt 哈希）
    pub admin_pass: String,
}

impl AdminState {
    pub fn new(jwt: JwtManager, admin_user: impl Into<String>, admin_pass: impl Into<String>) -> Self {
        Self {
            jwt,
            admin_user: admin_user.into(),
            admin_pass: admin_pass.into(),
        }
    }
}

/// Admin API 认证中间件
///
/// 无 token 或 token 无效返回 401，角色不是 admin 返回 403
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = auth::extract_bearer_token(&request) else {
        let error = AdminErrorResponse::authentication_error("Missing authorization token");
        return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
    };

    match state.jwt.verify_token(&token) {
        Ok(claims) if claims.role == ADMIN_ROLE => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Ok(claims) => {
            tracing::warn!("非管理员访问管理接口: sub={}, role={}", claims.sub, claims.role);
            (StatusCode::FORBIDDEN, Json(AdminErrorResponse::permission_error())).into_response()
        }
        Err(e) => {
            tracing::debug!("管理接口 token 校验失败: {}", e);
            let error = AdminErrorResponse::authentication_error("Invalid or expired token");
            (StatusCode::UNAUTHORIZED, Json(error)).into_response()
        }
    }
}
