//! # 剪贴板写入模块
//!
//! ## 设计思路
//!
//! 将与操作系统剪贴板交互的逻辑独立出来，便于隔离平台不稳定因素。
//! - `ClipboardBackend` 是写入能力接口，生产环境用 `SystemClipboard`（arboard），
//!   测试中替换为内存实现。
//! - 写入在阻塞线程执行，避免阻塞 async 运行时。
//! - 失败按 Busy / Transient / Fatal 分类，仅前两类参与重试。
//!
//! ## 实现思路
//!
//! 重试使用指数退避 + 抖动，并受总时间预算约束：
//! 等待时间会超出预算时直接放弃，而不是拖长用户等待。
//! 最终失败时 Busy 映射为 `ExportError::ClipboardBusy`，其余映射为 `ExportError::Clipboard`。

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use image::ImageFormat;

use super::{ClipboardPayload, ExportConfig, ExportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardFailureKind {
    /// 剪贴板被占用，稍后可能成功。
    Busy,
    /// 临时性错误。
    Transient,
    /// 不可恢复错误（数据无法转换、平台不支持等）。
    Fatal,
}

/// 单次剪贴板写入失败。
#[derive(Debug, Clone)]
pub struct ClipboardWriteFailure {
    pub kind: ClipboardFailureKind,
    pub message: String,
}

impl ClipboardWriteFailure {
    pub fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Busy,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Fatal,
            message: message.into(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self.kind, ClipboardFailureKind::Busy | ClipboardFailureKind::Transient)
    }
}

/// 剪贴板写入能力。
///
/// 实现需可跨线程共享：写入在阻塞线程池中执行。
pub trait ClipboardBackend: Send + Sync {
    fn write_image(&self, payload: &ClipboardPayload) -> Result<(), ClipboardWriteFailure>;
}

/// 基于 arboard 的系统剪贴板。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardBackend for SystemClipboard {
    fn write_image(&self, payload: &ClipboardPayload) -> Result<(), ClipboardWriteFailure> {
        // arboard 接收 RGBA 像素，并自行转换为各平台的图片格式（含 PNG）。
        let format = ImageFormat::from_mime_type(payload.mime_type)
            .ok_or_else(|| ClipboardWriteFailure::fatal(format!("不支持的 MIME 类型：{}", payload.mime_type)))?;
        let rgba = image::load_from_memory_with_format(&payload.bytes, format)
            .map_err(|e| ClipboardWriteFailure::fatal(format!("剪贴板图片解码失败：{}", e)))?
            .to_rgba8();

        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardWriteFailure::busy(format!("无法访问剪贴板：{}", e)))?;

        let image_data = arboard::ImageData {
            width: rgba.width() as usize,
            height: rgba.height() as usize,
            bytes: Cow::Borrowed(rgba.as_raw()),
        };

        clipboard.set_image(image_data).map_err(|e| match e {
            arboard::Error::ClipboardOccupied => ClipboardWriteFailure::busy(format!("剪贴板被占用：{}", e)),
            arboard::Error::ClipboardNotSupported | arboard::Error::ConversionFailure => {
                ClipboardWriteFailure::fatal(format!("复制失败：{}", e))
            }
            other => ClipboardWriteFailure::transient(format!("复制失败：{}", other)),
        })
    }
}

/// 抖动序列计数器，每次取值前进一个黄金分割步长。
static JITTER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// splitmix64：计数器叠加当前纳秒后打散，得到 `[0, bound]` 内的抖动。
fn jitter_up_to(bound: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let mut z = JITTER_COUNTER
        .fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::Relaxed)
        .wrapping_add(nanos);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    z % (bound.saturating_add(1))
}

/// 重试参数快照。
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    base_delay_ms: u64,
    max_total_ms: u64,
    max_delay_ms: u64,
}

impl From<&ExportConfig> for RetryPolicy {
    fn from(config: &ExportConfig) -> Self {
        Self {
            attempts: config.clipboard_retries.max(1),
            base_delay_ms: config.clipboard_retry_delay_ms.max(1),
            max_total_ms: config.clipboard_retry_max_total_ms,
            max_delay_ms: config.clipboard_retry_max_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试前的等待：`base * 2^(retry-1)`，封顶 `max_delay_ms`，再加不超过三分之一的抖动。
    fn backoff_ms(&self, retry: u32) -> u64 {
        let doubling = retry.saturating_sub(1).min(8);
        let delay = self
            .base_delay_ms
            .saturating_mul(1 << doubling)
            .min(self.max_delay_ms.max(self.base_delay_ms));
        delay.saturating_add(jitter_up_to((delay / 3).max(1)))
    }

    fn exceeds_budget(&self, elapsed_ms: u64, wait_ms: u64) -> bool {
        elapsed_ms.saturating_add(wait_ms) > self.max_total_ms
    }
}

/// 带重试的剪贴板写入器。
#[derive(Clone)]
pub struct ClipboardWriter {
    backend: Arc<dyn ClipboardBackend>,
}

impl ClipboardWriter {
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self { backend }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClipboard))
    }

    /// 将载荷写入剪贴板（含重试），在阻塞线程中执行。
    pub async fn write_with_retry(
        &self,
        payload: ClipboardPayload,
        config: &ExportConfig,
    ) -> Result<(), ExportError> {
        log::debug!(
            "📋 准备复制到剪贴板 - {}x{} {} ({} KB)",
            payload.width,
            payload.height,
            payload.mime_type,
            payload.bytes.len() / 1024
        );

        let backend = Arc::clone(&self.backend);
        let policy = RetryPolicy::from(config);

        tokio::task::spawn_blocking(move || Self::write_blocking(backend.as_ref(), &payload, policy))
            .await
            .map_err(|e| ExportError::Clipboard(format!("线程执行失败：{}", e)))?
    }

    fn write_blocking(
        backend: &dyn ClipboardBackend,
        payload: &ClipboardPayload,
        policy: RetryPolicy,
    ) -> Result<(), ExportError> {
        let started = Instant::now();
        let mut last_failure: Option<ClipboardWriteFailure> = None;

        for attempt in 1..=policy.attempts {
            if attempt > 1 {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let wait_ms = policy.backoff_ms(attempt - 1);

                if policy.exceeds_budget(elapsed_ms, wait_ms) {
                    log::warn!(
                        "⏱️ 跳过第 {} 次重试：等待 {}ms 会超过预算 {}ms",
                        attempt,
                        wait_ms,
                        policy.max_total_ms
                    );
                    break;
                }

                log::debug!("🔄 重试 {}/{}，等待 {}ms", attempt, policy.attempts, wait_ms);
                std::thread::sleep(Duration::from_millis(wait_ms));
            }

            match backend.write_image(payload) {
                Ok(()) => {
                    log::info!("✅ 复制成功 (尝试 {})", attempt);
                    return Ok(());
                }
                Err(failure) => {
                    let retryable = failure.is_retryable();
                    log::warn!(
                        "❌ 尝试 {} 失败: {}（kind={:?}, retryable={}）",
                        attempt,
                        failure.message,
                        failure.kind,
                        retryable
                    );
                    last_failure = Some(failure);

                    if !retryable {
                        log::warn!("🛑 非可重试错误，提前终止重试");
                        break;
                    }
                }
            }
        }

        match last_failure {
            Some(failure) if failure.kind == ClipboardFailureKind::Busy => {
                Err(ExportError::ClipboardBusy(failure.message))
            }
            Some(failure) => Err(ExportError::Clipboard(failure.message)),
            None => Err(ExportError::Clipboard("未知错误".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedBackend {
        script: Mutex<Vec<Result<(), ClipboardWriteFailure>>>,
        calls: AtomicU64,
    }

    impl ScriptedBackend {
        fn new(mut script: Vec<Result<(), ClipboardWriteFailure>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU64::new(0),
            }
        }
    }

    impl ClipboardBackend for ScriptedBackend {
        fn write_image(&self, _payload: &ClipboardPayload) -> Result<(), ClipboardWriteFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .expect("script lock")
                .pop()
                .unwrap_or_else(|| Err(ClipboardWriteFailure::fatal("script exhausted")))
        }
    }

    fn payload() -> ClipboardPayload {
        ClipboardPayload {
            mime_type: "image/png",
            width: 1,
            height: 1,
            bytes: vec![1, 2, 3],
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay_ms: 1,
            max_total_ms: 1_000,
            max_delay_ms: 5,
        }
    }

    fn default_policy() -> RetryPolicy {
        RetryPolicy::from(&ExportConfig::default())
    }

    #[test]
    fn first_retry_waits_base_delay_plus_jitter() {
        let policy = default_policy();

        for _ in 0..32 {
            let wait = policy.backoff_ms(1);
            assert!((100..=133).contains(&wait), "wait {} out of range", wait);
        }
    }

    #[test]
    fn backoff_doubles_until_max_delay() {
        let policy = default_policy();

        assert!((200..=266).contains(&policy.backoff_ms(2)));
        assert!((800..=1066).contains(&policy.backoff_ms(4)));
        // 100 * 2^4 超过 900，按 900 封顶
        assert!((900..=1200).contains(&policy.backoff_ms(5)));
        assert!((900..=1200).contains(&policy.backoff_ms(30)));
    }

    #[test]
    fn default_budget_allows_two_short_retries() {
        let policy = default_policy();

        assert!(!policy.exceeds_budget(0, 133));
        assert!(!policy.exceeds_budget(1_500, 266));
        assert!(policy.exceeds_budget(1_700, 133));
    }

    #[test]
    fn busy_then_success_is_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(ClipboardWriteFailure::busy("occupied")),
            Ok(()),
        ]);

        let result = ClipboardWriter::write_blocking(&backend, &payload(), fast_policy(3));

        assert!(result.is_ok());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fatal_failure_stops_immediately() {
        let backend = ScriptedBackend::new(vec![
            Err(ClipboardWriteFailure::fatal("permission denied")),
            Ok(()),
        ]);

        let result = ClipboardWriter::write_blocking(&backend, &payload(), fast_policy(3));

        assert!(matches!(result, Err(ExportError::Clipboard(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exhausted_busy_retries_map_to_clipboard_busy() {
        let backend = ScriptedBackend::new(vec![
            Err(ClipboardWriteFailure::busy("occupied")),
            Err(ClipboardWriteFailure::busy("occupied")),
        ]);

        let result = ClipboardWriter::write_blocking(&backend, &payload(), fast_policy(2));

        assert!(matches!(result, Err(ExportError::ClipboardBusy(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_budget_skips_retries() {
        let backend = ScriptedBackend::new(vec![
            Err(ClipboardWriteFailure::transient("flaky")),
            Ok(()),
        ]);
        let policy = RetryPolicy {
            attempts: 3,
            base_delay_ms: 50,
            max_total_ms: 0,
            max_delay_ms: 0,
        };

        let result = ClipboardWriter::write_blocking(&backend, &payload(), policy);

        assert!(matches!(result, Err(ExportError::Clipboard(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsupported_mime_type_is_fatal() {
        let result = SystemClipboard.write_image(&ClipboardPayload {
            mime_type: "text/plain",
            ..payload()
        });

        assert!(matches!(result, Err(ref f) if f.kind == ClipboardFailureKind::Fatal));
    }

    #[test]
    #[ignore = "requires system clipboard access"]
    fn system_clipboard_accepts_png_payload() {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");

        SystemClipboard
            .write_image(&ClipboardPayload {
                mime_type: "image/png",
                width: 2,
                height: 2,
                bytes,
            })
            .expect("clipboard write");
    }

    #[tokio::test]
    async fn async_write_runs_on_blocking_pool() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(())]));
        let writer = ClipboardWriter::new(backend.clone());

        writer
            .write_with_retry(payload(), &ExportConfig::default())
            .await
            .expect("write should succeed");

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
