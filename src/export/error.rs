//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载导出链路（截图 → 裁剪 → 编码 → 输出）中的所有错误来源，
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! `code()` / `stage()` 提供稳定的机器可读标识，宿主界面据此决定提示文案。

use super::SinkKind;

/// 导出链路统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// 截图目标未挂载或无法渲染。
    #[error("截图目标不可用：{0}")]
    RenderUnavailable(String),

    /// 截图结果完全透明，没有可裁剪的像素。
    #[error("截图内容为空：没有任何非透明像素")]
    EmptyCapture,

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("剪贴板错误：{0}")]
    Clipboard(String),

    /// 剪贴板被其他进程占用（重试后仍失败）。
    #[error("剪贴板忙：{0}")]
    ClipboardBusy(String),

    /// 当前视口不提供剪贴板导出能力。
    #[error("当前视口不支持复制到剪贴板")]
    ClipboardUnavailable,

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("配置错误：{0}")]
    InvalidConfig(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 像素数据与声明的宽高不符。
    #[error("位图数据无效：{0}")]
    InvalidBitmap(String),

    /// 同一输出目标已有导出在进行中。
    #[error("{0} 导出正在进行中")]
    InProgress(SinkKind),
}

impl ExportError {
    /// 稳定错误码，供宿主界面与日志聚合使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::RenderUnavailable(_) => "E_RENDER_UNAVAILABLE",
            Self::EmptyCapture => "E_EMPTY_CAPTURE",
            Self::Encode(_) => "E_ENCODE",
            Self::Clipboard(_) => "E_CLIPBOARD",
            Self::ClipboardBusy(_) => "E_CLIPBOARD_BUSY",
            Self::ClipboardUnavailable => "E_CLIPBOARD_UNAVAILABLE",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::InvalidConfig(_) => "E_INVALID_CONFIG",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::InvalidBitmap(_) => "E_INVALID_BITMAP",
            Self::InProgress(_) => "E_IN_PROGRESS",
        }
    }

    /// 错误发生的链路阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::RenderUnavailable(_) | Self::ResourceLimit(_) | Self::InvalidBitmap(_) => {
                "capture"
            }
            Self::EmptyCapture => "trim",
            Self::Encode(_) => "encode",
            Self::Clipboard(_) | Self::ClipboardBusy(_) | Self::ClipboardUnavailable => "clipboard",
            Self::FileSystem(_) => "file",
            Self::InvalidConfig(_) => "config",
            Self::InProgress(_) => "dispatch",
        }
    }
}

impl From<ExportError> for String {
    /// 兼容仍使用字符串错误的调用点。
    fn from(error: ExportError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        assert_eq!(ExportError::EmptyCapture.code(), "E_EMPTY_CAPTURE");
        assert_eq!(ExportError::EmptyCapture.stage(), "trim");
        assert_eq!(
            ExportError::RenderUnavailable("unmounted".into()).stage(),
            "capture"
        );
        assert_eq!(ExportError::ClipboardUnavailable.stage(), "clipboard");
        assert_eq!(ExportError::InProgress(SinkKind::File).code(), "E_IN_PROGRESS");

        let invalid = ExportError::InvalidBitmap("15 != 16".into());
        assert_eq!(invalid.code(), "E_INVALID_BITMAP");
        assert_eq!(invalid.stage(), "capture");
        assert!(invalid.to_string().contains("15 != 16"));
    }

    #[test]
    fn display_mentions_sink_for_in_progress() {
        let message = ExportError::InProgress(SinkKind::Clipboard).to_string();
        assert!(message.contains("clipboard"));
    }
}
