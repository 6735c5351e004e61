//! Admin API 类型定义

use serde::{Deserialize, Serialize};

/// 登录表单（application/x-www-form-urlencoded）
///
/// 兼容 OAuth2 password flow，多余字段（grant_type、scope 等）被忽略
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// 登录成功响应
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token 有效期（秒）
    pub expires_in: u64,
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct AdminErrorResponse {
    pub error: AdminError,
}

#[derive(Debug, Serialize)]
pub struct AdminError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl AdminErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: AdminError {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::new("authentication_error", message)
    }

    pub fn permission_error() -> Self {
        Self::new("permission_error", "admin only")
    }

    pub fn invalid_credentials() -> Self {
        Self::new("invalid_credentials", "bad credentials")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}
