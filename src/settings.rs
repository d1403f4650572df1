//! 设置文件读写
//!
//! 设置文件是可选的 JSON，字段全部可省略；读取时叠加到 `ExportConfig::default()` 上，
//! 叠加结果必须通过 `ExportConfig::validate`。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::export::{EmptyCapturePolicy, ExportConfig, PngCompression, ScalePolicy};

/// 设置文件内容。缺省字段沿用默认配置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_policy: Option<ScalePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrow_breakpoint_px: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_compression: Option<PngCompression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_capture_policy: Option<EmptyCapturePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capture_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_retry_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_retry_max_total_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_retry_max_delay_ms: Option<u64>,
}

impl ExportSettings {
    /// 叠加到已有配置上，只覆盖设置文件中出现的字段。
    pub fn apply_to(self, mut config: ExportConfig) -> ExportConfig {
        if let Some(v) = self.scale_policy {
            config.scale_policy = v;
        }
        if let Some(v) = self.narrow_breakpoint_px {
            config.narrow_breakpoint_px = v;
        }
        if let Some(v) = self.file_name {
            config.file_name = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = Some(v);
        }
        if let Some(v) = self.png_compression {
            config.png_compression = v;
        }
        if let Some(v) = self.empty_capture_policy {
            config.empty_capture_policy = v;
        }
        if let Some(v) = self.max_capture_pixels {
            config.max_capture_pixels = v;
        }
        if let Some(v) = self.clipboard_retries {
            config.clipboard_retries = v;
        }
        if let Some(v) = self.clipboard_retry_delay_ms {
            config.clipboard_retry_delay_ms = v;
        }
        if let Some(v) = self.clipboard_retry_max_total_ms {
            config.clipboard_retry_max_total_ms = v;
        }
        if let Some(v) = self.clipboard_retry_max_delay_ms {
            config.clipboard_retry_max_delay_ms = v;
        }
        config
    }
}

impl From<&ExportConfig> for ExportSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            scale_policy: Some(config.scale_policy),
            narrow_breakpoint_px: Some(config.narrow_breakpoint_px),
            file_name: Some(config.file_name.clone()),
            output_dir: config.output_dir.clone(),
            png_compression: Some(config.png_compression),
            empty_capture_policy: Some(config.empty_capture_policy),
            max_capture_pixels: Some(config.max_capture_pixels),
            clipboard_retries: Some(config.clipboard_retries),
            clipboard_retry_delay_ms: Some(config.clipboard_retry_delay_ms),
            clipboard_retry_max_total_ms: Some(config.clipboard_retry_max_total_ms),
            clipboard_retry_max_delay_ms: Some(config.clipboard_retry_max_delay_ms),
        }
    }
}

/// 读取设置文件；文件不存在时返回默认配置。
pub fn load_config(path: &Path) -> Result<ExportConfig, AppError> {
    if !path.exists() {
        log::debug!("⚙️ 设置文件不存在，使用默认配置: {}", path.display());
        return Ok(ExportConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let settings = serde_json::from_str::<ExportSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件 '{}' 失败: {}", path.display(), e)))?;

    let config = settings.apply_to(ExportConfig::default());
    config.validate()?;

    log::info!("⚙️ 已加载设置文件: {}", path.display());
    Ok(config)
}

/// 将配置完整写回设置文件（格式化 JSON）。
pub fn save_config(path: &Path, config: &ExportConfig) -> Result<(), AppError> {
    config.validate()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(&ExportSettings::from(config))
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("card-export-settings-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_file("missing");
        let _ = fs::remove_file(&path);

        assert_eq!(load_config(&path).expect("load"), ExportConfig::default());
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let path = temp_file("partial");
        fs::write(
            &path,
            r#"{ "file_name": "note.png", "empty_capture_policy": "keep_untrimmed" }"#,
        )
        .expect("write");

        let config = load_config(&path).expect("load");

        assert_eq!(config.file_name, "note.png");
        assert_eq!(config.empty_capture_policy, EmptyCapturePolicy::KeepUntrimmed);
        assert_eq!(config.scale_policy, ScalePolicy::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = temp_file("invalid");
        fs::write(&path, r#"{ "clipboard_retries": 0 }"#).expect("write");

        assert!(matches!(load_config(&path), Err(AppError::Export(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_is_settings_error() {
        let path = temp_file("malformed");
        fs::write(&path, "{ not json").expect("write");

        assert!(matches!(load_config(&path), Err(AppError::Settings(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_then_load_preserves_config() {
        let path = temp_file("saved");
        let mut config = ExportConfig::default();
        config.png_compression = PngCompression::Fast;
        config.scale_policy.file_narrow = 3.0;

        save_config(&path, &config).expect("save");
        assert_eq!(load_config(&path).expect("load"), config);
        let _ = fs::remove_file(&path);
    }
}
