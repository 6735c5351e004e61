//! 转发端点响应类型

use serde::Serialize;

/// 成功响应：`{"ok": true, "image_b64": "..."}`
#[derive(Debug, Serialize)]
pub struct ForwardResponse {
    pub ok: bool,
    /// PNG 图片的 base64 编码
    pub image_b64: String,
}

impl ForwardResponse {
    pub fn new(image_b64: String) -> Self {
        Self {
            ok: true,
            image_b64,
        }
    }
}
