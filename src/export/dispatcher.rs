//! # 导出调度器
//!
//! ## 设计思路
//!
//! `ExportDispatcher` 串联整条链路：截图 → 裁剪 → 编码 → 输出目标。
//! - 配置放在 `RwLock` 中，每次导出只取一次快照，运行中的导出不会看到半更新的配置。
//! - 视口信号由调用方逐次传入，不读取任何全局状态。
//! - 剪贴板能力仅在宽屏下存在：`clipboard(viewport)` 在窄屏返回 `None`，
//!   调用方拿不到句柄，也就无法触发复制。
//! - 每个输出目标同一时刻只允许一个导出，重复触发直接返回 `InProgress`。
//!
//! ## 实现思路
//!
//! ```text
//! export_to_file / ClipboardExport::copy
//!   -> SinkGuard::acquire
//!   -> produce(config snapshot)
//!        -> SnapshotRenderer::capture (scale = ScalePolicy::scale_for)
//!        -> trim (EmptyCapturePolicy)
//!        -> encode_png
//!   -> FileSink::save | ClipboardWriter::write_with_retry
//!   -> ExportNotifier
//! ```
//!
//! 文件导出的错误直接返回给调用方；剪贴板导出的错误在内部完整处理并通知用户，
//! 以 `CopyOutcome` 返回，不向上传播。

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::{
    CaptureRequest, CaptureSurface, ClipboardBackend, ClipboardPayload, ClipboardWriter,
    DownloadDirSink, EmptyCapturePolicy, ExportArtifact, ExportConfig, ExportError,
    ExportNotifier, FileArtifact, FileSink, LogNotifier, PNG_MIME_TYPE, SinkKind,
    SnapshotRenderer, ViewportSignal, encode_png, trim,
};

/// 剪贴板导出的最终结果。
#[derive(Debug)]
pub enum CopyOutcome {
    /// 已写入剪贴板，并已通知用户。
    Copied { width: u32, height: u32 },
    /// 失败，已通知用户。
    Failed(ExportError),
    /// 已有复制正在进行，本次触发被忽略。
    Skipped,
}

impl CopyOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }
}

/// 每个输出目标的“进行中”标志。
#[derive(Debug, Default)]
struct InFlight {
    file: AtomicBool,
    clipboard: AtomicBool,
}

impl InFlight {
    fn flag(&self, sink: SinkKind) -> &AtomicBool {
        match sink {
            SinkKind::File => &self.file,
            SinkKind::Clipboard => &self.clipboard,
        }
    }
}

/// RAII：构造时占用输出目标，`Drop` 时释放（包括出错和 panic 的路径）。
struct SinkGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SinkGuard<'a> {
    fn acquire(in_flight: &'a InFlight, sink: SinkKind) -> Result<Self, ExportError> {
        let flag = in_flight.flag(sink);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::InProgress(sink))?;
        Ok(Self { flag })
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 各阶段耗时（毫秒）。
#[derive(Debug, Default, Clone, Copy)]
struct StageTimings {
    capture_ms: u128,
    trim_ms: u128,
    encode_ms: u128,
}

/// 导出调度器。
pub struct ExportDispatcher {
    config: RwLock<ExportConfig>,
    file_sink: Box<dyn FileSink>,
    clipboard: ClipboardWriter,
    notifier: Arc<dyn ExportNotifier>,
    in_flight: InFlight,
}

impl ExportDispatcher {
    /// 使用系统剪贴板、下载目录与日志通知创建调度器。
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
            file_sink: Box::new(DownloadDirSink),
            clipboard: ClipboardWriter::system(),
            notifier: Arc::new(LogNotifier),
            in_flight: InFlight::default(),
        })
    }

    pub fn with_file_sink(mut self, sink: impl FileSink + 'static) -> Self {
        self.file_sink = Box::new(sink);
        self
    }

    pub fn with_clipboard_backend(mut self, backend: Arc<dyn ClipboardBackend>) -> Self {
        self.clipboard = ClipboardWriter::new(backend);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ExportNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 获取当前配置快照。
    pub fn config_snapshot(&self) -> Result<ExportConfig, ExportError> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| ExportError::ResourceLimit("配置读锁已中毒".to_string()))
    }

    /// 校验后替换配置；校验失败时保留旧配置。
    pub fn update_config(&self, config: ExportConfig) -> Result<(), ExportError> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| ExportError::ResourceLimit("配置写锁已中毒".to_string()))?;
        *guard = config;
        log::info!("⚙️ 导出配置已更新");
        Ok(())
    }

    /// 当前视口下可提供给用户的输出目标。
    pub fn available_sinks(&self, viewport: ViewportSignal) -> Vec<SinkKind> {
        if viewport.is_narrow() {
            vec![SinkKind::File]
        } else {
            vec![SinkKind::File, SinkKind::Clipboard]
        }
    }

    /// 剪贴板导出句柄；窄屏下不提供。
    pub fn clipboard(&self, viewport: ViewportSignal) -> Option<ClipboardExport<'_>> {
        if viewport.is_narrow() {
            log::debug!("📱 窄屏视口：不提供剪贴板导出");
            return None;
        }
        Some(ClipboardExport { dispatcher: self })
    }

    /// 截图并保存为下载文件，返回保存路径。
    ///
    /// 任一阶段失败都不会产生文件。
    pub async fn export_to_file<S>(
        &self,
        surface: &S,
        viewport: ViewportSignal,
    ) -> Result<PathBuf, ExportError>
    where
        S: CaptureSurface,
    {
        let _guard = SinkGuard::acquire(&self.in_flight, SinkKind::File)?;
        let config = self.config_snapshot()?;
        let started = Instant::now();

        let (artifact, timings) = self.produce(surface, SinkKind::File, viewport, &config).await?;
        let ExportArtifact::File(file) = artifact else {
            return Err(ExportError::Encode("产物类型与输出目标不符".to_string()));
        };

        let sink_started = Instant::now();
        let dir = crate::storage::resolve_output_dir(config.output_dir.as_deref())?;
        let path = self.file_sink.save(&dir, &file)?;
        log_timings(SinkKind::File, timings, sink_started, started);

        self.notifier.file_saved(&path);
        Ok(path)
    }

    /// 生成指定输出目标的产物但不投递（数据 URL、预览与测试使用）。
    pub async fn render_artifact<S>(
        &self,
        surface: &S,
        sink: SinkKind,
        viewport: ViewportSignal,
    ) -> Result<ExportArtifact, ExportError>
    where
        S: CaptureSurface,
    {
        if sink == SinkKind::Clipboard && viewport.is_narrow() {
            return Err(ExportError::ClipboardUnavailable);
        }
        let config = self.config_snapshot()?;
        let (artifact, _) = self.produce(surface, sink, viewport, &config).await?;
        Ok(artifact)
    }

    async fn produce<S>(
        &self,
        surface: &S,
        sink: SinkKind,
        viewport: ViewportSignal,
        config: &ExportConfig,
    ) -> Result<(ExportArtifact, StageTimings), ExportError>
    where
        S: CaptureSurface,
    {
        let mut timings = StageTimings::default();
        let scale = config.scale_policy.scale_for(sink, viewport);
        log::debug!("🎯 导出目标: {} 视口: {:?} 倍数: {}", sink, viewport, scale);

        let stage = Instant::now();
        let captured = SnapshotRenderer::new(config.max_capture_pixels)
            .capture(surface, CaptureRequest::transparent(scale))
            .await?;
        timings.capture_ms = stage.elapsed().as_millis();

        let stage = Instant::now();
        let trimmed = match trim(&captured) {
            Ok(bitmap) => bitmap,
            Err(ExportError::EmptyCapture)
                if config.empty_capture_policy == EmptyCapturePolicy::KeepUntrimmed =>
            {
                log::warn!("⚠️ 截图完全透明，按配置导出未裁剪的截图");
                captured
            }
            Err(e) => return Err(e),
        };
        timings.trim_ms = stage.elapsed().as_millis();

        let stage = Instant::now();
        let bytes = encode_png(&trimmed, config.png_compression)?;
        timings.encode_ms = stage.elapsed().as_millis();

        let (width, height) = (trimmed.width(), trimmed.height());
        let artifact = match sink {
            SinkKind::File => ExportArtifact::File(FileArtifact {
                file_name: config.file_name.clone(),
                width,
                height,
                bytes,
            }),
            SinkKind::Clipboard => ExportArtifact::Clipboard(ClipboardPayload {
                mime_type: PNG_MIME_TYPE,
                width,
                height,
                bytes,
            }),
        };

        Ok((artifact, timings))
    }
}

fn log_timings(sink: SinkKind, timings: StageTimings, sink_started: Instant, started: Instant) {
    log::info!(
        "⏱️ 导出完成 [{}] capture={}ms trim={}ms encode={}ms sink={}ms total={}ms",
        sink,
        timings.capture_ms,
        timings.trim_ms,
        timings.encode_ms,
        sink_started.elapsed().as_millis(),
        started.elapsed().as_millis()
    );
}

/// 剪贴板导出句柄，只能通过 `ExportDispatcher::clipboard` 在宽屏下获得。
pub struct ClipboardExport<'a> {
    dispatcher: &'a ExportDispatcher,
}

impl ClipboardExport<'_> {
    /// 截图并复制到剪贴板。
    ///
    /// 成功与失败都会通过通知器反馈给用户，错误不会向上传播。
    pub async fn copy<S>(&self, surface: &S) -> CopyOutcome
    where
        S: CaptureSurface,
    {
        let dispatcher = self.dispatcher;
        let _guard = match SinkGuard::acquire(&dispatcher.in_flight, SinkKind::Clipboard) {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("⏳ 已有复制正在进行，忽略本次触发");
                return CopyOutcome::Skipped;
            }
        };

        match self.run(surface).await {
            Ok((width, height)) => {
                dispatcher.notifier.copied(width, height);
                CopyOutcome::Copied { width, height }
            }
            Err(e) => {
                log::error!("❌ 复制到剪贴板失败 [{}/{}]: {}", e.stage(), e.code(), e);
                dispatcher.notifier.copy_failed(&e);
                CopyOutcome::Failed(e)
            }
        }
    }

    async fn run<S>(&self, surface: &S) -> Result<(u32, u32), ExportError>
    where
        S: CaptureSurface,
    {
        let dispatcher = self.dispatcher;
        let config = dispatcher.config_snapshot()?;
        let started = Instant::now();

        let (artifact, timings) = dispatcher
            .produce(surface, SinkKind::Clipboard, ViewportSignal::Wide, &config)
            .await?;
        let ExportArtifact::Clipboard(payload) = artifact else {
            return Err(ExportError::Encode("产物类型与输出目标不符".to_string()));
        };
        let dimensions = (payload.width, payload.height);

        let sink_started = Instant::now();
        dispatcher.clipboard.write_with_retry(payload, &config).await?;
        log_timings(SinkKind::Clipboard, timings, sink_started, started);

        Ok(dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_guard_rejects_second_acquire_until_dropped() {
        let in_flight = InFlight::default();

        let first = SinkGuard::acquire(&in_flight, SinkKind::File).expect("first acquire");
        assert!(matches!(
            SinkGuard::acquire(&in_flight, SinkKind::File),
            Err(ExportError::InProgress(SinkKind::File))
        ));
        // 不同输出目标互不影响
        let other = SinkGuard::acquire(&in_flight, SinkKind::Clipboard).expect("other sink");

        drop(first);
        drop(other);
        assert!(SinkGuard::acquire(&in_flight, SinkKind::File).is_ok());
    }

    #[test]
    fn narrow_viewport_offers_file_only() {
        let dispatcher = ExportDispatcher::new(ExportConfig::default()).expect("dispatcher");

        assert_eq!(dispatcher.available_sinks(ViewportSignal::Narrow), vec![SinkKind::File]);
        assert_eq!(
            dispatcher.available_sinks(ViewportSignal::Wide),
            vec![SinkKind::File, SinkKind::Clipboard]
        );
        assert!(dispatcher.clipboard(ViewportSignal::Narrow).is_none());
        assert!(dispatcher.clipboard(ViewportSignal::Wide).is_some());
    }

    #[test]
    fn update_config_keeps_old_value_on_invalid_input() {
        let dispatcher = ExportDispatcher::new(ExportConfig::default()).expect("dispatcher");

        let mut bad = ExportConfig::default();
        bad.file_name = String::new();
        assert!(dispatcher.update_config(bad).is_err());
        assert_eq!(
            dispatcher.config_snapshot().expect("snapshot").file_name,
            "quote-card.png"
        );

        let mut good = ExportConfig::default();
        good.file_name = "note.png".to_string();
        dispatcher.update_config(good).expect("update");
        assert_eq!(dispatcher.config_snapshot().expect("snapshot").file_name, "note.png");
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = ExportConfig::default();
        config.scale_policy.clipboard = -1.0;
        assert!(matches!(
            ExportDispatcher::new(config),
            Err(ExportError::InvalidConfig(_))
        ));
    }
}
