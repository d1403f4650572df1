//! # 位图模型
//!
//! ## 设计思路
//!
//! `Bitmap` 是整条导出链路的中间数据：RGBA 四通道、每通道 8 位、按行存储。
//! 构造时强制校验 `bytes.len() == width * height * 4`，之后的阶段无需重复检查。
//!
//! `InkBounds` 表示“墨迹像素”（alpha ≠ 0）的包围盒，四个坐标均为闭区间。
//! 完全透明的位图没有包围盒，用 `Option<InkBounds>` 的 `None` 表达。

use image::RgbaImage;

use super::ExportError;

/// RGBA 位图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// 墨迹像素包围盒（闭区间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub top: u32,
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize, ExportError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ExportError::ResourceLimit("位图尺寸导致内存溢出风险".to_string()))
}

impl Bitmap {
    /// 由原始 RGBA 字节构造位图。
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ExportError> {
        let expected = expected_len(width, height)?;
        if pixels.len() != expected {
            return Err(ExportError::InvalidBitmap(format!(
                "像素数据长度异常：期望 {} 实际 {}",
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 创建全透明位图。
    pub fn transparent(width: u32, height: u32) -> Result<Self, ExportError> {
        let len = expected_len(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![0; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// 读取像素；越界返回 `None`。
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// 写入像素；越界时忽略。
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// 单行像素字节。
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.offset(0, y);
        &self.pixels[start..start + self.width as usize * 4]
    }

    /// 复制包围盒内的像素为新位图，原位图不变。
    pub fn crop(&self, bounds: InkBounds) -> Result<Self, ExportError> {
        if bounds.right >= self.width
            || bounds.bottom >= self.height
            || bounds.left > bounds.right
            || bounds.top > bounds.bottom
        {
            return Err(ExportError::ResourceLimit(format!(
                "裁剪区域越界：{:?}（位图 {}x{}）",
                bounds, self.width, self.height
            )));
        }

        let width = bounds.width();
        let height = bounds.height();
        let row_bytes = width as usize * 4;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);

        for y in bounds.top..=bounds.bottom {
            let start = self.offset(bounds.left, y);
            pixels.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}
