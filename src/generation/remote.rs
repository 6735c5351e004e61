//! 远端 diffusion 服务后端（OpenAI 兼容 images API）

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use image::{DynamicImage, GenericImageView, Rgb};
use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;

use super::{GenerationBackend, ImageToImage, TextToImage, codec, normalize_device};
use crate::common::truncate_str_safe;

/// 错误响应体最多保留的字节数
const MAX_ERROR_BODY_BYTES: usize = 500;
/// 不支持图生图时回退图上方黑条高度
const FALLBACK_BAND_HEIGHT: u32 = 54;

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

pub struct RemoteBackend {
    client: Client,
    endpoint: String,
    model_id: String,
}

impl RemoteBackend {
    pub fn new(endpoint: &str, model_id: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        tracing::info!(
            "远端生成后端: endpoint={}, model={}, timeout={}s",
            endpoint,
            model_id,
            timeout_secs
        );

        Ok(Self {
            client,
            endpoint,
            model_id: model_id.to_string(),
        })
    }

    /// 读取 b64_json 响应并解码第一张图
    async fn read_image(response: reqwest::Response) -> Result<DynamicImage> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "generation server returned {}: {}",
                status,
                truncate_str_safe(&body, MAX_ERROR_BODY_BYTES)
            );
        }

        let payload: ImagesResponse = response
            .json()
            .await
            .context("invalid response from generation server")?;
        let b64 = payload
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| anyhow!("generation server returned no image"))?;
        codec::decode_base64_image(&b64)
    }
}

#[async_trait::async_trait]
impl GenerationBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn text_to_image(&self, request: TextToImage) -> Result<DynamicImage> {
        let mut body = serde_json::json!({
            "model": self.model_id,
            "prompt": request.prompt,
            "size": format!("{}x{}", request.width, request.height),
            "n": 1,
            "response_format": "b64_json",
            "steps": request.steps,
            "device": normalize_device(&request.device),
        });
        if let Some(seed) = request.seed {
            body["seed"] = serde_json::json!(seed);
        }

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.endpoint))
            .json(&body)
            .send()
            .await
            .context("generation server unreachable")?;

        let image = Self::read_image(response).await?;
        tracing::debug!(
            "远端 t2i 完成: {:?}, {}ms",
            image.dimensions(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }

    async fn image_to_image(&self, request: ImageToImage) -> Result<DynamicImage> {
        let png = codec::encode_png(&request.image)?;

        let mut form = multipart::Form::new()
            .part(
                "image",
                multipart::Part::bytes(png)
                    .file_name("image.png")
                    .mime_str("image/png")?,
            )
            .text("model", self.model_id.clone())
            .text("prompt", request.prompt.clone())
            .text("strength", request.strength.to_string())
            .text("steps", request.steps.to_string())
            .text("device", normalize_device(&request.device))
            .text("response_format", "b64_json")
            .text("n", "1");
        if let Some(seed) = request.seed {
            form = form.text("seed", seed.to_string());
        }

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/images/edits", self.endpoint))
            .multipart(form)
            .send()
            .await
            .context("generation server unreachable")?;

        if is_unsupported(response.status()) {
            tracing::warn!(
                "远端服务不支持图生图（{}），返回带标记的原图",
                response.status()
            );
            return Ok(fallback_overlay(&request.image));
        }

        let image = Self::read_image(response).await?;
        tracing::debug!(
            "远端 i2i 完成: {:?}, {}ms",
            image.dimensions(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

fn is_unsupported(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

/// 原图顶部盖一条黑带，表明没有经过模型处理
fn fallback_overlay(image: &DynamicImage) -> DynamicImage {
    let mut rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    for y in 0..FALLBACK_BAND_HEIGHT.min(height) {
        for x in 0..width {
            rgb.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    DynamicImage::ImageRgb8(rgb)
}
