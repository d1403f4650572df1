//! # 文件输出与用户通知
//!
//! ## 设计思路
//!
//! - `FileSink`：把 `FileArtifact` 落盘，返回最终路径。
//! - `ExportNotifier`：导出结果的用户可见反馈（复制成功 / 复制失败 / 已保存）。
//!
//! ## 实现思路
//!
//! `DownloadDirSink` 先用 `create_new` 独占占用最终文件名，再写入同目录下的临时文件，
//! 最后 `rename` 覆盖自己的占位文件。任何失败都会删除临时文件和占位文件，
//! 因此目录中不会出现半截 PNG，也不会覆盖别人的文件。
//! 目标文件名已存在时，按浏览器下载的习惯追加序号：`quote-card (1).png`。

use std::fs;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{ExportError, FileArtifact};

/// 同名文件最多尝试的序号。
const MAX_NAME_SUFFIX: u32 = 999;

/// 文件输出目标。
pub trait FileSink: Send + Sync {
    /// 将产物保存到 `dir`，返回实际写入的路径。
    fn save(&self, dir: &Path, artifact: &FileArtifact) -> Result<PathBuf, ExportError>;
}

/// 写入下载目录的文件输出。
#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadDirSink;

impl FileSink for DownloadDirSink {
    fn save(&self, dir: &Path, artifact: &FileArtifact) -> Result<PathBuf, ExportError> {
        if artifact.bytes.is_empty() {
            return Err(ExportError::Encode("没有可保存的图片数据".to_string()));
        }

        let target = claim_unique_path(dir, &artifact.file_name)?;
        let temp = temp_path_for(&target);

        let result = write_file(&temp, &artifact.bytes)
            .map_err(|e| format!("写入临时文件 '{}' 失败：{}", temp.display(), e))
            .and_then(|()| {
                // 目标已由本进程独占创建，rename 只会替换自己的占位文件
                fs::rename(&temp, &target)
                    .map_err(|e| format!("保存文件 '{}' 失败：{}", target.display(), e))
            });

        if let Err(message) = result {
            let _ = fs::remove_file(&temp);
            let _ = fs::remove_file(&target);
            return Err(ExportError::FileSystem(message));
        }

        log::info!(
            "💾 已保存图片: {} ({} KB)",
            target.display(),
            artifact.bytes.len() / 1024
        );
        Ok(target)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.part", name))
}

/// 候选文件名：`quote-card.png`、`quote-card (1).png`、`quote-card (2).png` ……
fn candidate_names(file_name: &str) -> impl Iterator<Item = String> + '_ {
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());

    std::iter::once(file_name.to_string()).chain((1..=MAX_NAME_SUFFIX).map(move |n| {
        match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        }
    }))
}

/// 在 `dir` 下独占创建第一个未被占用的文件名，返回其路径。
///
/// 使用 `create_new` 占位，其他进程同时写入同名文件时不会被覆盖，而是顺延到下一个序号。
pub fn claim_unique_path(dir: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
    for candidate in candidate_names(file_name) {
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(ExportError::FileSystem(format!(
                    "创建文件 '{}' 失败：{}",
                    path.display(),
                    e
                )));
            }
        }
    }

    Err(ExportError::FileSystem(format!(
        "目录 '{}' 中同名文件过多：{}",
        dir.display(),
        file_name
    )))
}

/// 导出结果的用户可见反馈。
pub trait ExportNotifier: Send + Sync {
    fn copied(&self, width: u32, height: u32);

    fn copy_failed(&self, error: &ExportError);

    fn file_saved(&self, _path: &Path) {}
}

/// 仅写日志的通知实现（命令行与无界面宿主使用）。
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ExportNotifier for LogNotifier {
    fn copied(&self, width: u32, height: u32) {
        log::info!("📋 图片已复制到剪贴板 ({}x{})", width, height);
    }

    fn copy_failed(&self, error: &ExportError) {
        log::error!("❌ 复制失败 [{}]: {}", error.code(), error);
    }

    fn file_saved(&self, path: &Path) {
        log::info!("✅ 图片已保存: {}", path.display());
    }
}
