//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 导出链路内部使用 `ExportError`；命令行入口、设置文件读写等外层调用
//! 统一返回 `AppError`，避免各处 `.map_err(|e| e.to_string())`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ExportError` / `std::io::Error` 提供 `From` 转换，配合 `?` 使用。
//! - 实现 `Serialize` 将错误序列化为字符串，便于宿主界面直接展示。

use serde::Serialize;

use crate::export::ExportError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 导出流水线错误（截图 / 裁剪 / 编码 / 输出）
    #[error("{0}")]
    Export(#[from] ExportError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件无法解析或写入
    #[error("设置错误: {0}")]
    Settings(String),

    /// 输入图片无法读取或解码
    #[error("输入图片无效: {0}")]
    Input(String),
}

impl AppError {
    /// 稳定错误码；非导出错误使用固定前缀。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Export(e) => e.code(),
            Self::Io(_) => "E_IO",
            Self::Settings(_) => "E_SETTINGS",
            Self::Input(_) => "E_INPUT",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_errors_keep_their_message_and_code() {
        let error = AppError::from(ExportError::EmptyCapture);

        assert_eq!(error.to_string(), ExportError::EmptyCapture.to_string());
        assert_eq!(error.code(), "E_EMPTY_CAPTURE");
    }

    #[test]
    fn serializes_as_display_string() {
        let error = AppError::Settings("bad json".to_string());
        let json = serde_json::to_string(&error).expect("serialize");
        assert_eq!(json, "\"设置错误: bad json\"");
    }
}
