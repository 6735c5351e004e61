//! Admin 认证相关处理器
//!
//! 提供登录端点

use axum::{Form, extract::State, http::StatusCode, response::Json};

use super::{
    jwt::ADMIN_ROLE,
    middleware::AdminState,
    types::{AdminErrorResponse, LoginForm, LoginResponse},
};
use crate::common::auth;

/// POST /auth/login
///
/// 校验管理员用户名和密码，返回 JWT Token
pub async fn login(
    State(state): State<AdminState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<AdminErrorResponse>)> {
    if !verify_credentials(&state, &form.username, &form.password) {
        tracing::warn!("管理员登录失败: username={}", form.username);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(AdminErrorResponse::invalid_credentials()),
        ));
    }

    let (token, expires_in) = state
        .jwt
        .generate_token(&form.username, ADMIN_ROLE)
        .map_err(|e| {
            tracing::error!("生成 token 失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminErrorResponse::internal_error("Failed to generate token")),
            )
        })?;

    tracing::info!("管理员登录成功: username={}", form.username);
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_in,
    }))
}

/// 校验用户名和密码
///
/// 用户名使用常量时间比较；密码若配置为 bcrypt 哈希则按哈希校验
fn verify_credentials(state: &AdminState, username: &str, password: &str) -> bool {
    let user_ok = auth::constant_time_eq(username, &state.admin_user);
    let pass_ok = if is_bcrypt_hash(&state.admin_pass) {
        bcrypt::verify(password, &state.admin_pass).unwrap_or(false)
    } else {
        auth::constant_time_eq(password, &state.admin_pass)
    };
    user_ok && pass_ok
}

fn is_bcrypt_hash(s: &str) -> bool {
    s.starts_with("$2a$") || s.starts_with("$2b$") || s.starts_with("$2y$")
}
