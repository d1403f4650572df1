//! 下载目录管理模块
//!
//! # 设计思路
//!
//! 统一解析导出文件的保存目录，支持用户自定义目录，
//! 并在目录不存在时自动创建。
//!
//! # 实现思路
//!
//! - 优先使用配置中的自定义目录。
//! - 未设置时回退到当前工作目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。

use std::fs;
use std::path::{Path, PathBuf};

use crate::export::ExportError;

/// 获取下载目录
///
/// # 返回
/// - `Ok(PathBuf)`：可写入的目录
/// - `Err(ExportError::FileSystem)`：无法获取或创建目录
pub fn resolve_output_dir(custom_dir: Option<&Path>) -> Result<PathBuf, ExportError> {
    let dir = match custom_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()
            .map_err(|e| ExportError::FileSystem(format!("获取当前目录失败: {}", e)))?,
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            ExportError::FileSystem(format!("创建下载目录 '{}' 失败: {}", dir.display(), e))
        })?;
        log::info!("📁 已创建下载目录: {}", dir.display());
    } else if !dir.is_dir() {
        return Err(ExportError::FileSystem(format!(
            "下载路径 '{}' 不是目录",
            dir.display()
        )));
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_custom_directory() {
        let dir = std::env::temp_dir()
            .join(format!("card-export-storage-{}", std::process::id()))
            .join("nested");
        let _ = fs::remove_dir_all(&dir);

        let resolved = resolve_output_dir(Some(&dir)).expect("resolve");

        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(dir.parent().unwrap_or(&dir));
    }

    #[test]
    fn falls_back_to_current_directory() {
        let resolved = resolve_output_dir(None).expect("resolve");
        assert_eq!(resolved, std::env::current_dir().expect("cwd"));
        assert_eq!(resolve_output_dir(Some(Path::new(""))).expect("resolve"), resolved);
    }

    #[test]
    fn rejects_file_path() {
        let file = std::env::temp_dir().join(format!("card-export-storage-file-{}", std::process::id()));
        fs::write(&file, b"x").expect("write");

        assert!(matches!(
            resolve_output_dir(Some(&file)),
            Err(ExportError::FileSystem(_))
        ));
        let _ = fs::remove_file(&file);
    }
}
