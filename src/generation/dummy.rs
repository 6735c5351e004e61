//! 占位图后端
//!
//! 不加载任何模型，直接画一张带标记的占位图，用于本地开发和无 GPU 环境

use anyhow::{Result, bail};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use super::{GenerationBackend, ImageToImage, TextToImage};

/// 单边最大像素
const MAX_SIDE: u32 = 4096;
/// 顶部标题栏高度
const HEADER_HEIGHT: u32 = 64;

const BACKGROUND: Rgb<u8> = Rgb([240, 240, 240]);
const HEADER: Rgb<u8> = Rgb([30, 30, 30]);
const MARKER: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Default)]
pub struct DummyBackend;

impl DummyBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl GenerationBackend for DummyBackend {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn text_to_image(&self, request: TextToImage) -> Result<DynamicImage> {
        tracing::debug!(
            "dummy t2i: {}x{}, steps={}, seed={:?}",
            request.width,
            request.height,
            request.steps,
            request.seed
        );
        placeholder(request.width, request.height)
    }

    async fn image_to_image(&self, request: ImageToImage) -> Result<DynamicImage> {
        let (width, height) = request.image.dimensions();
        tracing::debug!(
            "dummy i2i: {}x{}, strength={}, steps={}",
            width,
            height,
            request.strength,
            request.steps
        );
        placeholder(width, height)
    }
}

/// 浅灰底、深色标题栏、底部红色描边框
fn placeholder(width: u32, height: u32) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        bail!("invalid image size {}x{}", width, height);
    }
    if width > MAX_SIDE || height > MAX_SIDE {
        bail!(
            "image size {}x{} exceeds limit {}x{}",
            width,
            height,
            MAX_SIDE,
            MAX_SIDE
        );
    }

    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    for y in 0..HEADER_HEIGHT.min(height) {
        for x in 0..width {
            canvas.put_pixel(x, y, HEADER);
        }
    }

    // 描边框 [12, h-52] - [w-12, h-12]，线宽 3，尺寸太小时不画
    if width > 24 + 6 && height > 52 + 6 {
        draw_outline(&mut canvas, 12, height - 52, width - 12, height - 12, 3, MARKER);
    }

    Ok(DynamicImage::ImageRgb8(canvas))
}

fn draw_outline(
    canvas: &mut RgbImage,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    thickness: u32,
    color: Rgb<u8>,
) {
    for y in y0..y1 {
        for x in x0..x1 {
            let on_edge = x < x0 + thickness
                || x >= x1 - thickness
                || y < y0 + thickness
                || y >= y1 - thickness;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t2i(width: u32, height: u32) -> TextToImage {
        TextToImage {
            prompt: "a red fox".to_string(),
            width,
            height,
            steps: 20,
            seed: None,
            device: "auto".to_string(),
        }
    }

    #[tokio::test]
    async fn test_text_to_image_uses_requested_size() {
        let image = DummyBackend::new().text_to_image(t2i(320, 200)).await.unwrap();
        assert_eq!(image.dimensions(), (320, 200));

        let rgb = image.to_rgb8();
        assert_eq!(rgb.get_pixel(5, 5), &HEADER);
        assert_eq!(rgb.get_pixel(5, 100), &BACKGROUND);
        // 描边框左上角
        assert_eq!(rgb.get_pixel(12, 200 - 52), &MARKER);
    }

    #[tokio::test]
    async fn test_image_to_image_keeps_input_size() {
        let input = DynamicImage::ImageRgb8(RgbImage::new(33, 17));
        let request = ImageToImage {
            image: input,
            prompt: "oil painting".to_string(),
            steps: 20,
            strength: 0.6,
            seed: Some(7),
            device: "cpu".to_string(),
        };
        let image = DummyBackend::new().image_to_image(request).await.unwrap();
        assert_eq!(image.dimensions(), (33, 17));
    }

    #[tokio::test]
    async fn test_rejects_invalid_sizes() {
        let backend = DummyBackend::new();
        assert!(backend.text_to_image(t2i(0, 512)).await.is_err());
        assert!(backend.text_to_image(t2i(512, MAX_SIDE + 1)).await.is_err());
    }
}
