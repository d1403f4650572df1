//! # 场景截图目标
//!
//! ## 设计思路
//!
//! `SceneSurface` 是 `CaptureSurface` 的参考实现：预览渲染器把卡片描述为一棵节点树
//! （逻辑像素矩形 + 纯色或图片填充 + 子节点），导出核心按任意倍数把它光栅化。
//!
//! 带 `NodeRole::Preview` 的节点是“预览面板”：截图时其后代被裁剪在它自己的边界内，
//! 不允许溢出；普通节点的子节点可以溢出到父节点之外。
//!
//! ## 实现思路
//!
//! - 子节点坐标相对父节点原点，换算设备像素时四舍五入。
//! - 图片填充只重采样与画布/裁剪区相交的可见窗口（`fast_image_resize` 源图裁剪），
//!   失败时回退 `image::imageops::resize`；节点尺寸不影响内存占用。
//! - 合成采用非预乘 alpha 的 source-over。
//! - 挂载状态用 `AtomicBool` 表示，截图本身只读。

use std::sync::atomic::{AtomicBool, Ordering};

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{ImageBuffer, Rgba, RgbaImage};

use super::{Background, Bitmap, CaptureSurface, ExportError, LogicalSize};

/// 逻辑像素矩形（相对父节点原点）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LogicalRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 节点填充。
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    None,
    /// 非预乘 RGBA 纯色。
    Fill([u8; 4]),
    /// 拉伸铺满节点矩形的图片。
    Image(RgbaImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRole {
    #[default]
    Plain,
    /// 预览面板：截图时裁剪溢出内容。
    Preview,
}

/// 场景节点。
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub rect: LogicalRect,
    pub paint: Paint,
    pub role: NodeRole,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(rect: LogicalRect) -> Self {
        Self {
            rect,
            paint: Paint::None,
            role: NodeRole::Plain,
            children: Vec::new(),
        }
    }

    pub fn with_fill(mut self, rgba: [u8; 4]) -> Self {
        self.paint = Paint::Fill(rgba);
        self
    }

    pub fn with_image(mut self, image: RgbaImage) -> Self {
        self.paint = Paint::Image(image);
        self
    }

    pub fn as_preview(mut self) -> Self {
        self.role = NodeRole::Preview;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

/// 设备像素矩形，半开区间 `[x0, x1) × [y0, y1)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl DeviceRect {
    fn from_logical(origin_x: f32, origin_y: f32, rect: LogicalRect, scale: f32) -> Self {
        let to_device = |v: f32| (v as f64 * scale as f64).round() as i64;
        let x = origin_x + rect.x;
        let y = origin_y + rect.y;
        Self {
            x0: to_device(x),
            y0: to_device(y),
            x1: to_device(x + rect.width.max(0.0)),
            y1: to_device(y + rect.height.max(0.0)),
        }
    }

    fn intersect(self, other: Self) -> Self {
        Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }

    fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0).clamp(0, u32::MAX as i64) as u32
    }

    fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0).clamp(0, u32::MAX as i64) as u32
    }
}

/// 由场景节点树构成的截图目标。
#[derive(Debug)]
pub struct SceneSurface {
    size: LogicalSize,
    nodes: Vec<SceneNode>,
    mounted: AtomicBool,
}

impl SceneSurface {
    pub fn new(size: LogicalSize, nodes: Vec<SceneNode>) -> Self {
        Self {
            size,
            nodes,
            mounted: AtomicBool::new(true),
        }
    }

    /// 由预先渲染好的预览图构建单节点场景。
    ///
    /// `source_scale` 为预览图的设备像素比，逻辑尺寸 = 像素尺寸 / `source_scale`。
    pub fn from_image(image: RgbaImage, source_scale: f32) -> Result<Self, ExportError> {
        if !source_scale.is_finite() || source_scale <= 0.0 {
            return Err(ExportError::InvalidConfig(format!(
                "预览图倍数必须为正数，当前为 {}",
                source_scale
            )));
        }

        let (width, height) = image.dimensions();
        let size = LogicalSize::new(width as f32 / source_scale, height as f32 / source_scale);
        let node = SceneNode::new(LogicalRect::new(0.0, 0.0, size.width, size.height))
            .with_image(image)
            .as_preview();

        Ok(Self::new(size, vec![node]))
    }

    pub fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn paint_node(
        canvas: &mut RgbaImage,
        node: &SceneNode,
        origin: (f32, f32),
        scale: f32,
        clip: DeviceRect,
    ) {
        let rect = DeviceRect::from_logical(origin.0, origin.1, node.rect, scale);
        let visible = rect.intersect(clip);

        if !visible.is_empty() {
            match &node.paint {
                Paint::None => {}
                Paint::Fill(rgba) => {
                    for y in visible.y0..visible.y1 {
                        for x in visible.x0..visible.x1 {
                            blend_over(canvas.get_pixel_mut(x as u32, y as u32), *rgba);
                        }
                    }
                }
                Paint::Image(image) => {
                    // 只重采样可见窗口，节点再大也不会超出画布尺寸
                    let scaled = resample_window(image, rect, visible);
                    for y in visible.y0..visible.y1 {
                        for x in visible.x0..visible.x1 {
                            let sx = (x - visible.x0) as u32;
                            let sy = (y - visible.y0) as u32;
                            if let Some(src) = scaled.get_pixel_checked(sx, sy) {
                                blend_over(canvas.get_pixel_mut(x as u32, y as u32), src.0);
                            }
                        }
                    }
                }
            }
        }

        let child_clip = match node.role {
            NodeRole::Preview => visible,
            NodeRole::Plain => clip,
        };
        if child_clip.is_empty() {
            return;
        }

        let child_origin = (origin.0 + node.rect.x, origin.1 + node.rect.y);
        for child in &node.children {
            Self::paint_node(canvas, child, child_origin, scale, child_clip);
        }
    }
}

impl CaptureSurface for SceneSurface {
    fn logical_size(&self) -> Option<LogicalSize> {
        self.is_mounted().then_some(self.size)
    }

    async fn render_at(&self, scale: f32, background: Background) -> Result<Bitmap, ExportError> {
        let size = self
            .logical_size()
            .ok_or_else(|| ExportError::RenderUnavailable("场景未挂载".to_string()))?;
        let (width, height) = size.to_device(scale);

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background.fill_rgba()));
        let clip = DeviceRect {
            x0: 0,
            y0: 0,
            x1: width as i64,
            y1: height as i64,
        };

        for node in &self.nodes {
            Self::paint_node(&mut canvas, node, (0.0, 0.0), scale, clip);
        }

        log::debug!(
            "🖼️ 场景光栅化完成 - 逻辑尺寸: {}x{} 倍数: {} 输出: {}x{}",
            size.width,
            size.height,
            scale,
            width,
            height
        );

        Ok(Bitmap::from(canvas))
    }
}

/// 非预乘 alpha 的 source-over 合成。
fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.0 = src;
        return;
    }

    let da = dst.0[3] as u32;
    let dst_weight = da * (255 - sa);
    let out_alpha_scaled = sa * 255 + dst_weight;

    for c in 0..3 {
        let value = (src[c] as u32 * sa * 255 + dst.0[c] as u32 * dst_weight + out_alpha_scaled / 2)
            / out_alpha_scaled;
        dst.0[c] = value.min(255) as u8;
    }
    dst.0[3] = ((out_alpha_scaled + 127) / 255).min(255) as u8;
}

/// 源图中与可见窗口对应的区域（源像素坐标，可为小数）。
#[derive(Debug, Clone, Copy, PartialEq)]
struct SourceWindow {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl SourceWindow {
    /// 按节点矩形到源图的比例，把可见窗口映射回源图，并限制在源图范围内。
    fn map(src_width: u32, src_height: u32, rect: DeviceRect, visible: DeviceRect) -> Self {
        let axis = |src: u32, r0: i64, r1: i64, v0: i64, v1: i64| {
            let src = src as f64;
            let span = (r1 as f64 - r0 as f64).max(1.0);
            let ratio = src / span;
            let start = ((v0 as f64 - r0 as f64) * ratio).clamp(0.0, src);
            let len = ((v1 as f64 - v0 as f64) * ratio).clamp(src.min(1.0), src);
            (start.min(src - len), len)
        };
        let (left, width) = axis(src_width, rect.x0, rect.x1, visible.x0, visible.x1);
        let (top, height) = axis(src_height, rect.y0, rect.y1, visible.y0, visible.y1);
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_whole(&self, src_width: u32, src_height: u32) -> bool {
        self.left == 0.0
            && self.top == 0.0
            && self.width == src_width as f64
            && self.height == src_height as f64
    }
}

/// 将节点图片中落在 `visible` 内的部分重采样为 `visible` 的设备尺寸。
fn resample_window(image: &RgbaImage, rect: DeviceRect, visible: DeviceRect) -> RgbaImage {
    let (width, height) = (visible.width(), visible.height());
    let (src_width, src_height) = image.dimensions();
    if width == 0 || height == 0 || src_width == 0 || src_height == 0 {
        return RgbaImage::new(width, height);
    }

    let window = SourceWindow::map(src_width, src_height, rect, visible);
    if window.is_whole(src_width, src_height) && (src_width, src_height) == (width, height) {
        return image.clone();
    }

    match resize_with_fast_image_resize(image, window, width, height) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 重采样失败，回退 image::resize：{}", err);
            let x0 = (window.left.floor() as u32).min(src_width - 1);
            let y0 = (window.top.floor() as u32).min(src_height - 1);
            let x1 = ((window.left + window.width).ceil() as u32).clamp(x0 + 1, src_width);
            let y1 = ((window.top + window.height).ceil() as u32).clamp(y0 + 1, src_height);
            let cropped = image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
            image::imageops::resize(&cropped, width, height, FilterType::CatmullRom)
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    window: SourceWindow,
    width: u32,
    height: u32,
) -> Result<RgbaImage, String> {
    let (src_width, src_height) = image.dimensions();
    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| format!("构建源图像缓冲失败：{}", e))?;

    let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .crop(window.left, window.top, window.width, window.height)
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| format!("重采样执行失败：{}", e))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| "重采样输出缓冲长度异常".to_string())
}
