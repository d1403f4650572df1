//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ExportConfig`，保证运行时行为可观测、可调整、可测试。
//! 缩放策略、文件名、PNG 压缩档位、空白截图处理以及剪贴板重试预算都在这里。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `ScalePolicy::scale_for` 将“输出目标 + 视口信号”映射为缩放倍数。
//!   文件导出随视口变化（窄屏 4 倍，宽屏 2 倍），剪贴板导出固定 2 倍，
//!   这是有意保留的不对称，不要“顺手修正”。
//! - `validate` 在配置生效前拒绝非法组合。

use std::path::PathBuf;

use image::codecs::png::CompressionType;
use serde::{Deserialize, Serialize};

use super::{ExportError, SinkKind, ViewportSignal};

/// 默认下载文件名。
pub const DEFAULT_FILE_NAME: &str = "quote-card.png";

/// 窄屏判定阈值（逻辑像素）。
pub const DEFAULT_NARROW_BREAKPOINT_PX: u32 = 768;

/// 各输出目标使用的截图缩放倍数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalePolicy {
    /// 宽屏下载使用的倍数。
    pub file_wide: f32,
    /// 窄屏（移动端）下载使用的倍数。
    pub file_narrow: f32,
    /// 复制到剪贴板使用的倍数，与视口无关。
    pub clipboard: f32,
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            file_wide: 2.0,
            file_narrow: 4.0,
            clipboard: 2.0,
        }
    }
}

impl ScalePolicy {
    /// 计算指定输出目标在指定视口下的缩放倍数。
    ///
    /// # 示例
    /// ```rust
    /// use card_export::export::{ScalePolicy, SinkKind, ViewportSignal};
    ///
    /// let policy = ScalePolicy::default();
    /// assert_eq!(policy.scale_for(SinkKind::File, ViewportSignal::Narrow), 4.0);
    /// assert_eq!(policy.scale_for(SinkKind::Clipboard, ViewportSignal::Narrow), 2.0);
    /// ```
    pub fn scale_for(&self, sink: SinkKind, viewport: ViewportSignal) -> f32 {
        match (sink, viewport) {
            (SinkKind::File, ViewportSignal::Narrow) => self.file_narrow,
            (SinkKind::File, ViewportSignal::Wide) => self.file_wide,
            (SinkKind::Clipboard, _) => self.clipboard,
        }
    }
}

/// 截图完全透明时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCapturePolicy {
    /// 以 `ExportError::EmptyCapture` 终止本次导出。
    #[default]
    Fail,
    /// 跳过裁剪，直接导出未裁剪的截图。
    KeepUntrimmed,
}

/// PNG 压缩档位（始终无损，只影响体积与编码耗时）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

impl PngCompression {
    pub(crate) fn to_image_compression(self) -> CompressionType {
        match self {
            Self::Fast => CompressionType::Fast,
            Self::Default => CompressionType::Default,
            Self::Best => CompressionType::Best,
        }
    }
}

/// 导出配置。
///
/// 字段覆盖截图、裁剪、编码与两个输出目标。
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub scale_policy: ScalePolicy,
    /// 视口宽度小于该值视为窄屏。
    pub narrow_breakpoint_px: u32,
    /// 下载文件名。
    pub file_name: String,
    /// 下载目录，`None` 表示当前工作目录。
    pub output_dir: Option<PathBuf>,
    pub png_compression: PngCompression,
    pub empty_capture_policy: EmptyCapturePolicy,
    /// 截图像素上限（`width * height`），超出直接拒绝。
    pub max_capture_pixels: u64,
    /// 写入剪贴板失败时最大尝试次数。
    pub clipboard_retries: u32,
    /// 重试基础间隔（毫秒）。
    pub clipboard_retry_delay_ms: u64,
    /// 单次写入流程允许的总重试预算（毫秒）。
    pub clipboard_retry_max_total_ms: u64,
    /// 单次退避延迟上限（毫秒）。
    pub clipboard_retry_max_delay_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale_policy: ScalePolicy::default(),
            narrow_breakpoint_px: DEFAULT_NARROW_BREAKPOINT_PX,
            file_name: DEFAULT_FILE_NAME.to_string(),
            output_dir: None,
            png_compression: PngCompression::Best,
            empty_capture_policy: EmptyCapturePolicy::Fail,
            max_capture_pixels: 40_000_000,
            clipboard_retries: 3,
            clipboard_retry_delay_ms: 100,
            clipboard_retry_max_total_ms: 1_800,
            clipboard_retry_max_delay_ms: 900,
        }
    }
}

impl ExportConfig {
    /// 校验配置组合是否合法。
    pub fn validate(&self) -> Result<(), ExportError> {
        let scales = [
            ("file_wide", self.scale_policy.file_wide),
            ("file_narrow", self.scale_policy.file_narrow),
            ("clipboard", self.scale_policy.clipboard),
        ];
        for (name, scale) in scales {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ExportError::InvalidConfig(format!(
                    "缩放倍数 {} 必须为正数，当前为 {}",
                    name, scale
                )));
            }
        }

        if self.file_name.trim().is_empty() {
            return Err(ExportError::InvalidConfig("文件名不能为空".to_string()));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(ExportError::InvalidConfig(format!(
                "文件名不能包含路径分隔符：{}",
                self.file_name
            )));
        }
        if self.max_capture_pixels == 0 {
            return Err(ExportError::InvalidConfig("max_capture_pixels 不能为 0".to_string()));
        }
        if self.clipboard_retries == 0 {
            return Err(ExportError::InvalidConfig("clipboard_retries 至少为 1".to_string()));
        }
        if self.clipboard_retry_max_delay_ms > self.clipboard_retry_max_total_ms {
            return Err(ExportError::InvalidConfig(
                "clipboard_retry_max_delay_ms 不能大于 clipboard_retry_max_total_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// 根据视口宽度计算视口信号。
    pub fn viewport_for_width(&self, width_px: u32) -> ViewportSignal {
        ViewportSignal::from_width(width_px, self.narrow_breakpoint_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ExportConfig::default()
            .validate()
            .expect("default config should validate");
    }

    #[test]
    fn scale_policy_keeps_clipboard_fixed() {
        let policy = ScalePolicy::default();

        assert_eq!(policy.scale_for(SinkKind::File, ViewportSignal::Narrow), 4.0);
        assert_eq!(policy.scale_for(SinkKind::File, ViewportSignal::Wide), 2.0);
        assert_eq!(policy.scale_for(SinkKind::Clipboard, ViewportSignal::Narrow), 2.0);
        assert_eq!(policy.scale_for(SinkKind::Clipboard, ViewportSignal::Wide), 2.0);
    }

    #[test]
    fn validate_rejects_non_positive_scale() {
        let mut config = ExportConfig::default();
        config.scale_policy.file_narrow = 0.0;
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));

        config.scale_policy.file_narrow = f32::NAN;
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_path_like_file_name() {
        let mut config = ExportConfig::default();
        config.file_name = "../card.png".to_string();
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_inconsistent_retry_budget() {
        let mut config = ExportConfig::default();
        config.clipboard_retry_max_delay_ms = 5_000;
        config.clipboard_retry_max_total_ms = 1_000;
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));

        let mut config = ExportConfig::default();
        config.clipboard_retries = 0;
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn viewport_for_width_uses_breakpoint() {
        let config = ExportConfig::default();
        assert_eq!(config.viewport_for_width(375), ViewportSignal::Narrow);
        assert_eq!(config.viewport_for_width(768), ViewportSignal::Wide);
        assert_eq!(config.viewport_for_width(1440), ViewportSignal::Wide);
    }
}
