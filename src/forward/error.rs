//! 转发端点错误类型

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// 400 响应体
pub const BAD_REQUEST_BODY: &str = "bad request";
/// 403 响应体（不暴露后端原始错误）
pub const GENERATION_FAILED_BODY: &str = "generation backend failed to process the input";

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// 输入缺失或格式错误，原因只写日志，不进记录
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 生成后端处理失败，消息会写入记录的 error 字段
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl ForwardError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// 包装后端错误，保留完整错误链
    pub fn generation(err: anyhow::Error) -> Self {
        Self::GenerationFailed(format!("{:#}", err))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::GenerationFailed(_) => StatusCode::FORBIDDEN,
        }
    }

    /// 需要写入请求记录的错误信息
    pub fn record_message(&self) -> Option<&str> {
        match self {
            Self::BadRequest(_) => None,
            Self::GenerationFailed(msg) => Some(msg),
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let body = match self {
            Self::BadRequest(_) => BAD_REQUEST_BODY,
            Self::GenerationFailed(_) => GENERATION_FAILED_BODY,
        };
        (self.status_code(), body).into_response()
    }
}
