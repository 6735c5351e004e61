//! 历史/统计 API 响应类型

use serde::Serialize;

/// 分布摘要：均值和 p50/p95/p99
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantilePack {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// GET /stats 响应
///
/// 样本为空的字段序列化为 null
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub count_total: usize,
    pub count_ok: usize,
    /// 仅统计状态码 200 的请求
    pub latency_ms: Option<QuantilePack>,
    pub prompt_len_chars: Option<QuantilePack>,
    pub token_count: Option<QuantilePack>,
    pub image_w: Option<QuantilePack>,
    pub image_h: Option<QuantilePack>,
}

/// 通用成功响应
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}
