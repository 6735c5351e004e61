//! 图像生成后端
//!
//! 转发端点只依赖 [`GenerationBackend`]，具体实现在启动时按配置选择：
//! - [`DummyBackend`]：不依赖模型的占位图
//! - [`RemoteBackend`]：转发到 OpenAI 兼容的 diffusion 服务

pub mod codec;
mod dummy;
mod remote;

use std::sync::Arc;

use anyhow::Result;
use image::DynamicImage;

use crate::model::config::Config;

pub use dummy::DummyBackend;
pub use remote::RemoteBackend;

/// 文生图参数
#[derive(Debug, Clone)]
pub struct TextToImage {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub seed: Option<i64>,
    pub device: String,
}

/// 图生图参数
#[derive(Debug, Clone)]
pub struct ImageToImage {
    pub image: DynamicImage,
    pub prompt: String,
    pub steps: u32,
    pub strength: f32,
    pub seed: Option<i64>,
    pub device: String,
}

/// 图像生成能力
///
/// 两个操作都可能很慢、可能失败；错误信息会被截断后写入请求记录
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &str;

    async fn text_to_image(&self, request: TextToImage) -> Result<DynamicImage>;

    async fn image_to_image(&self, request: ImageToImage) -> Result<DynamicImage>;
}

/// 规范化设备偏好：cpu / mps / cuda 原样保留，其余一律视为 auto
pub fn normalize_device(requested: &str) -> &'static str {
    match requested.trim().to_ascii_lowercase().as_str() {
        "cpu" => "cpu",
        "mps" => "mps",
        "cuda" => "cuda",
        _ => "auto",
    }
}

/// 按配置构建生成后端
pub fn build_backend(config: &Config) -> Result<Arc<dyn GenerationBackend>> {
    if config.use_dummy_model {
        tracing::info!("使用占位图生成后端（dummy）");
        return Ok(Arc::new(DummyBackend::new()));
    }

    let url = config
        .generation_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("未配置 generationUrl"))?;
    let backend = RemoteBackend::new(url, &config.model_id, config.generation_timeout_secs)?;
    Ok(Arc::new(backend))
}
