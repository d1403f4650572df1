//! # 透明边裁剪
//!
//! ## 设计思路
//!
//! 截图以透明背景渲染，卡片四周会留下大片 alpha = 0 的区域。
//! 裁剪阶段找出所有“墨迹像素”（alpha ≠ 0）的最小包围盒，并复制出该区域。
//!
//! ## 实现思路
//!
//! - 按行优先顺序单遍扫描，维护 `top/left/right/bottom` 四个运行值。
//! - 扫描自上而下，因此 `top` 就是第一个墨迹像素的 y；
//!   `left/right/bottom` 通过显式 min/max 更新。
//! - 一行内只需找到最左与最右的墨迹像素即可更新边界，不必逐个比较。
//! - 同步执行、不挂起；大图只是耗时更长，不影响正确性。

use super::{Bitmap, ExportError, InkBounds};

fn is_ink(pixel: &[u8]) -> bool {
    pixel[3] != 0
}

/// 计算墨迹像素包围盒；完全透明时返回 `None`。
pub fn ink_bounds(bitmap: &Bitmap) -> Option<InkBounds> {
    let mut bounds: Option<InkBounds> = None;

    for y in 0..bitmap.height() {
        let row = bitmap.row(y);
        let mut pixels = row.chunks_exact(4);

        let Some(first) = pixels.position(is_ink) else {
            continue;
        };
        let last = row
            .chunks_exact(4)
            .rposition(is_ink)
            .unwrap_or(first);
        let (first, last) = (first as u32, last as u32);

        bounds = Some(match bounds {
            None => InkBounds {
                top: y,
                left: first,
                right: last,
                bottom: y,
            },
            Some(current) => InkBounds {
                top: current.top,
                left: current.left.min(first),
                right: current.right.max(last),
                bottom: current.bottom.max(y),
            },
        });
    }

    bounds
}

/// 将位图裁剪到墨迹包围盒。
///
/// 完全透明时返回 `ExportError::EmptyCapture`，不产生任何输出。
///
/// # 示例
/// ```rust
/// use card_export::export::{trim, Bitmap};
///
/// let mut bitmap = Bitmap::transparent(10, 10)?;
/// bitmap.set_pixel(3, 4, [200, 10, 10, 255]);
///
/// let trimmed = trim(&bitmap)?;
/// assert_eq!((trimmed.width(), trimmed.height()), (1, 1));
/// assert_eq!(trimmed.pixel(0, 0), Some([200, 10, 10, 255]));
/// # Ok::<(), card_export::export::ExportError>(())
/// ```
pub fn trim(bitmap: &Bitmap) -> Result<Bitmap, ExportError> {
    let bounds = ink_bounds(bitmap).ok_or(ExportError::EmptyCapture)?;

    log::debug!(
        "✂️ 透明边裁剪：{}x{} -> {}x{}（top={} left={} right={} bottom={}）",
        bitmap.width(),
        bitmap.height(),
        bounds.width(),
        bounds.height(),
        bounds.top,
        bounds.left,
        bounds.right,
        bounds.bottom
    );

    bitmap.crop(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_with(width: u32, height: u32, ink: &[(u32, u32, [u8; 4])]) -> Bitmap {
        let mut bitmap = Bitmap::transparent(width, height).expect("alloc");
        for &(x, y, rgba) in ink {
            bitmap.set_pixel(x, y, rgba);
        }
        bitmap
    }

    #[test]
    fn single_ink_pixel_trims_to_one_by_one() {
        let bitmap = bitmap_with(10, 10, &[(3, 4, [12, 34, 56, 255])]);

        let trimmed = trim(&bitmap).expect("has ink");

        assert_eq!(trimmed.width(), 1);
        assert_eq!(trimmed.height(), 1);
        assert_eq!(trimmed.pixel(0, 0), Some([12, 34, 56, 255]));
    }

    #[test]
    fn fully_transparent_is_empty_capture() {
        let bitmap = Bitmap::transparent(8, 5).expect("alloc");
        assert_eq!(ink_bounds(&bitmap), None);
        assert!(matches!(trim(&bitmap), Err(ExportError::EmptyCapture)));
    }

    #[test]
    fn zero_sized_bitmap_is_empty_capture() {
        let bitmap = Bitmap::transparent(0, 0).expect("alloc");
        assert!(matches!(trim(&bitmap), Err(ExportError::EmptyCapture)));
    }

    #[test]
    fn bounds_use_min_max_not_first_seen() {
        // 第一行的墨迹在右侧，后续行出现更靠左的墨迹。
        let bitmap = bitmap_with(
            6,
            6,
            &[(4, 1, [1, 1, 1, 1]), (1, 3, [2, 2, 2, 2]), (2, 4, [3, 3, 3, 3])],
        );

        let bounds = ink_bounds(&bitmap).expect("has ink");

        assert_eq!(
            bounds,
            InkBounds {
                top: 1,
                left: 1,
                right: 4,
                bottom: 4
            }
        );
    }

    #[test]
    fn color_without_alpha_is_not_ink() {
        let bitmap = bitmap_with(4, 4, &[(0, 0, [255, 255, 255, 0]), (2, 2, [0, 0, 0, 1])]);

        let bounds = ink_bounds(&bitmap).expect("has ink");

        assert_eq!(
            bounds,
            InkBounds {
                top: 2,
                left: 2,
                right: 2,
                bottom: 2
            }
        );
    }

    #[test]
    fn trim_is_idempotent() {
        let bitmap = bitmap_with(
            9,
            7,
            &[(2, 1, [9, 9, 9, 255]), (6, 5, [8, 8, 8, 40]), (4, 3, [7, 7, 7, 3])],
        );

        let once = trim(&bitmap).expect("has ink");
        let twice = trim(&once).expect("still has ink");

        assert_eq!(once, twice);
        assert_eq!((once.width(), once.height()), (5, 5));
    }

    #[test]
    fn opaque_bitmap_is_unchanged() {
        let bitmap = Bitmap::from_rgba(3, 2, vec![255; 24]).expect("alloc");
        assert_eq!(trim(&bitmap).expect("has ink"), bitmap);
    }
}
