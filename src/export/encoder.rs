//! # PNG 编码
//!
//! 将裁剪后的位图编码为无损 PNG，并用 `infer` 校验输出确实是 PNG。
//! 编码结果为空或类型不符时统一报 `ExportError::Encode`，调用方不得输出任何产物。

use image::ImageEncoder;
use image::codecs::png::{FilterType, PngEncoder};

use super::artifact::PNG_MIME_TYPE;
use super::{Bitmap, ExportError, PngCompression};

/// 将位图编码为 PNG 字节。
pub fn encode_png(bitmap: &Bitmap, compression: PngCompression) -> Result<Vec<u8>, ExportError> {
    if bitmap.is_empty() {
        return Err(ExportError::Encode(format!(
            "无法编码空位图：{}x{}",
            bitmap.width(),
            bitmap.height()
        )));
    }

    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buf,
        compression.to_image_compression(),
        FilterType::Adaptive,
    );
    encoder
        .write_image(
            bitmap.as_bytes(),
            bitmap.width(),
            bitmap.height(),
            image::ColorType::Rgba8.into(),
        )
        .map_err(|e| ExportError::Encode(format!("PNG 编码失败：{}", e)))?;

    if buf.is_empty() {
        return Err(ExportError::Encode("PNG 编码结果为空".to_string()));
    }

    let detected = infer::get(&buf).map(|kind| kind.mime_type());
    if detected != Some(PNG_MIME_TYPE) {
        return Err(ExportError::Encode(format!(
            "编码结果类型异常：{:?}",
            detected
        )));
    }

    log::debug!(
        "🗜️ PNG 编码完成 - {}x{} -> {} KB（compression={:?}）",
        bitmap.width(),
        bitmap.height(),
        buf.len() / 1024,
        compression
    );

    Ok(buf)
}
