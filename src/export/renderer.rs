//! # 截图渲染器
//!
//! ## 设计思路
//!
//! `SnapshotRenderer` 包装任意 `CaptureSurface`，在真正读回像素前后做统一校验：
//! 1. 倍数必须为有限正数
//! 2. 目标必须已挂载（否则 `RenderUnavailable`，调用方不得继续裁剪）
//! 3. 预计像素数不超过上限，避免超大截图占满内存
//! 4. 等待字体/图片就绪后再渲染
//! 5. 输出尺寸与 `round(logical * scale)` 相差不超过 1 像素
//!
//! 渲染器本身无状态，每次导出创建一次即可。

use super::{Background, Bitmap, CaptureSurface, ExportError};

/// 单次截图请求。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    pub scale: f32,
    pub background: Background,
}

impl CaptureRequest {
    /// 透明背景截图（导出链路默认使用）。
    pub fn transparent(scale: f32) -> Self {
        Self {
            scale,
            background: Background::Transparent,
        }
    }
}

/// 截图渲染器。
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRenderer {
    max_pixels: u64,
}

impl SnapshotRenderer {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    /// 截取 `surface` 的当前渲染结果。
    pub async fn capture<S>(&self, surface: &S, request: CaptureRequest) -> Result<Bitmap, ExportError>
    where
        S: CaptureSurface,
    {
        let scale = request.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ExportError::InvalidConfig(format!(
                "截图倍数必须为正数，当前为 {}",
                scale
            )));
        }

        let size = surface
            .logical_size()
            .ok_or_else(|| ExportError::RenderUnavailable("截图目标未挂载".to_string()))?;
        let (expected_width, expected_height) = size.to_device(scale);

        if expected_width == 0 || expected_height == 0 {
            return Err(ExportError::RenderUnavailable(format!(
                "截图目标尺寸为空：{}x{}",
                size.width, size.height
            )));
        }
        self.validate_pixel_limits(expected_width, expected_height)?;

        log::info!(
            "📸 开始截图 - 逻辑尺寸: {}x{} 倍数: {} 预计输出: {}x{}",
            size.width,
            size.height,
            scale,
            expected_width,
            expected_height
        );

        surface.ready().await?;
        let bitmap = surface.render_at(scale, request.background).await?;

        let width_off = bitmap.width().abs_diff(expected_width);
        let height_off = bitmap.height().abs_diff(expected_height);
        if width_off > 1 || height_off > 1 {
            return Err(ExportError::RenderUnavailable(format!(
                "截图尺寸异常：期望 {}x{} 实际 {}x{}",
                expected_width,
                expected_height,
                bitmap.width(),
                bitmap.height()
            )));
        }

        Ok(bitmap)
    }

    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), ExportError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ExportError::ResourceLimit("截图像素数溢出".to_string()))?;

        if pixels > self.max_pixels {
            return Err(ExportError::ResourceLimit(format!(
                "截图像素过大：{} 像素（限制：{} 像素）",
                pixels, self.max_pixels
            )));
        }

        Ok(())
    }
}
