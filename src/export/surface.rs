//! # 截图目标抽象
//!
//! ## 设计思路
//!
//! 导出核心不拥有卡片内容，只在导出时读取一次渲染结果。
//! 因此把“可截图区域”抽象为 `CaptureSurface` 能力接口：
//! - `logical_size`：当前渲染尺寸（逻辑像素），未挂载时为 `None`
//! - `ready`：等待字体/图片等资源就绪
//! - `render_at`：按指定倍数与背景读回像素
//!
//! 测试中可用合成位图的桩实现替代真实渲染器。
//! 视口信号同样以显式参数传入，而不是读取全局可变状态。

use serde::{Deserialize, Serialize};

use super::{Bitmap, ExportError};

/// 逻辑像素尺寸（CSS 像素）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalSize {
    pub width: f32,
    pub height: f32,
}

impl LogicalSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// 按倍数换算为设备像素（四舍五入）。
    pub fn to_device(self, scale: f32) -> (u32, u32) {
        (
            device_px(self.width, scale),
            device_px(self.height, scale),
        )
    }
}

fn device_px(logical: f32, scale: f32) -> u32 {
    let value = (logical as f64 * scale as f64).round();
    if value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value as u32
    }
}

/// 截图背景填充。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    /// 保留 alpha，供后续裁剪使用。
    #[default]
    Transparent,
    /// 不透明纯色（alpha 会被强制为 255）。
    Opaque([u8; 3]),
}

impl Background {
    pub fn fill_rgba(self) -> [u8; 4] {
        match self {
            Self::Transparent => [0, 0, 0, 0],
            Self::Opaque([r, g, b]) => [r, g, b, 255],
        }
    }
}

/// 视口信号：是否处于窄屏（移动端）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportSignal {
    Narrow,
    Wide,
}

impl ViewportSignal {
    /// 视口宽度严格小于阈值时判定为窄屏。
    pub fn from_width(width_px: u32, breakpoint_px: u32) -> Self {
        if width_px < breakpoint_px {
            Self::Narrow
        } else {
            Self::Wide
        }
    }

    pub fn from_narrow_flag(is_narrow: bool) -> Self {
        if is_narrow { Self::Narrow } else { Self::Wide }
    }

    pub fn is_narrow(self) -> bool {
        matches!(self, Self::Narrow)
    }
}

/// 可截图区域能力接口。
///
/// 实现方只负责读回像素，不得在截图过程中修改自身状态。
#[allow(async_fn_in_trait)]
pub trait CaptureSurface {
    /// 当前渲染尺寸；未挂载或不可渲染时返回 `None`。
    fn logical_size(&self) -> Option<LogicalSize>;

    /// 等待字体、图片等资源就绪。
    async fn ready(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// 以 `scale` 倍设备像素渲染，输出尺寸应为 `round(logical * scale)`。
    async fn render_at(&self, scale: f32, background: Background) -> Result<Bitmap, ExportError>;
}

impl<S: CaptureSurface> CaptureSurface for &S {
    fn logical_size(&self) -> Option<LogicalSize> {
        (**self).logical_size()
    }

    async fn ready(&self) -> Result<(), ExportError> {
        (**self).ready().await
    }

    async fn render_at(&self, scale: f32, background: Background) -> Result<Bitmap, ExportError> {
        (**self).render_at(scale, background).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_size_rounds_to_nearest() {
        let size = LogicalSize::new(100.4, 50.5);
        assert_eq!(size.to_device(1.0), (100, 51));
        assert_eq!(size.to_device(2.0), (201, 101));
        assert_eq!(LogicalSize::new(-3.0, 0.0).to_device(2.0), (0, 0));
    }

    #[test]
    fn opaque_background_forces_full_alpha() {
        assert_eq!(Background::Opaque([1, 2, 3]).fill_rgba(), [1, 2, 3, 255]);
        assert_eq!(Background::Transparent.fill_rgba(), [0, 0, 0, 0]);
    }

    #[test]
    fn viewport_from_width_and_flag() {
        assert!(ViewportSignal::from_width(500, 768).is_narrow());
        assert!(!ViewportSignal::from_width(1024, 768).is_narrow());
        assert_eq!(ViewportSignal::from_narrow_flag(true), ViewportSignal::Narrow);
    }
}
