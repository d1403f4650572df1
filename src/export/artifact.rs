//! # 导出产物模型
//!
//! ## 设计思路
//!
//! 将“输出目标语义”和“编码后的产物”解耦：
//! - `SinkKind` 表示输出目标（下载文件 / 系统剪贴板）
//! - `FileArtifact` 表示待保存的文件（文件名 + PNG 字节）
//! - `ClipboardPayload` 表示待写入剪贴板的单个带 MIME 类型的图片数据
//!
//! 产物每次导出生成一次，交给输出目标后即丢弃，不做缓存。

use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// PNG 的 MIME 类型。
pub const PNG_MIME_TYPE: &str = "image/png";

/// 输出目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    File,
    Clipboard,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Clipboard => "clipboard",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 下载文件产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// 剪贴板产物：单个带 MIME 类型的图片数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// 一次导出的产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    File(FileArtifact),
    Clipboard(ClipboardPayload),
}

impl ExportArtifact {
    pub fn sink(&self) -> SinkKind {
        match self {
            Self::File(_) => SinkKind::File,
            Self::Clipboard(_) => SinkKind::Clipboard,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::File(file) => &file.bytes,
            Self::Clipboard(payload) => &payload.bytes,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::File(file) => (file.width, file.height),
            Self::Clipboard(payload) => (payload.width, payload.height),
        }
    }

    /// 以 `data:image/png;base64,...` 形式输出，供网页链接或内联预览使用。
    pub fn to_data_url(&self) -> String {
        let mime_type = match self {
            Self::File(_) => PNG_MIME_TYPE,
            Self::Clipboard(payload) => payload.mime_type,
        };
        encode_data_url(mime_type, self.bytes())
    }
}

fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}
