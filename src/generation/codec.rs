//! 图像编解码

use std::io::Cursor;

use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};

/// 解码上传的图片字节，统一转换为 RGB
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        bail!("图片数据为空");
    }
    let image = image::load_from_memory(bytes).context("图片解码失败")?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// 解码 base64 图片（远端服务的 b64_json 字段）
pub fn decode_base64_image(data: &str) -> Result<DynamicImage> {
    let bytes = STANDARD.decode(data.trim()).context("base64 解码失败")?;
    decode_image_bytes(&bytes)
}

/// 编码为 PNG 字节
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .context("PNG 编码失败")?;
    Ok(buf.into_inner())
}

/// 编码为 PNG 后再做标准 base64
pub fn encode_png_base64(image: &DynamicImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_png_base64_round_trip() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 3, Rgb([1, 2, 3])));
        let encoded = encode_png_base64(&source).unwrap();
        let decoded = decode_base64_image(&encoded).unwrap();
        assert_eq!(decoded.dimensions(), (7, 3));
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_encode_png_has_signature() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let png = encode_png(&source).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47])); // PNG 文件头
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_image_bytes(&[]).is_err());
        assert!(decode_image_bytes(b"definitely not an image").is_err());
        assert!(decode_base64_image("***").is_err());
    }
}
