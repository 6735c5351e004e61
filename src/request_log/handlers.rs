//! 历史记录 / 统计 API 处理器

use axum::{
    Extension,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};

use super::router::RequestLogState;
use super::types::OkResponse;
use crate::admin::jwt::Claims;
use crate::admin::types::AdminErrorResponse;
use crate::common::auth;

/// 清空历史时需要携带的确认头
pub const CONFIRM_TOKEN_HEADER: &str = "x-confirm-token";

/// GET /history
pub async fn get_history(State(state): State<RequestLogState>) -> impl IntoResponse {
    match state.log.history().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("查询请求记录失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminErrorResponse::internal_error(format!("查询失败: {}", e))),
            )
                .into_response()
        }
    }
}

/// DELETE /history
///
/// `x-confirm-token` 不匹配时返回 403 纯文本 `forbidden`，不做任何删除
pub async fn clear_history(
    State(state): State<RequestLogState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let confirmed = headers
        .get(CONFIRM_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| auth::constant_time_eq(token, &state.history_delete_token));

    if !confirmed {
        tracing::warn!("清空历史记录被拒绝（确认 token 不匹配）: sub={}", claims.sub);
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    match state.log.clear().await {
        Ok(count) => {
            tracing::info!("已清除 {} 条请求记录: sub={}", count, claims.sub);
            Json(OkResponse::new()).into_response()
        }
        Err(e) => {
            tracing::error!("清空请求记录失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminErrorResponse::internal_error(format!("清空失败: {}", e))),
            )
                .into_response()
        }
    }
}

/// GET /stats
pub async fn get_stats(State(state): State<RequestLogState>) -> impl IntoResponse {
    match state.log.stats().await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("获取请求统计失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminErrorResponse::internal_error(format!("统计失败: {}", e))),
            )
                .into_response()
        }
    }
}
