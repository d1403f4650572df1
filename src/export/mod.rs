//! # 卡片导出模块（export）
//!
//! ## 设计思路
//!
//! 将“截图 → 裁剪透明边 → 编码 → 输出（下载文件 / 剪贴板）”按职责拆分，
//! 每个子模块只处理一个阶段，便于单独测试和替换。
//!
//! - `surface`：可截图区域能力接口、背景与视口信号
//! - `scene`：内置的场景树截图实现（含预览区裁剪）
//! - `renderer`：截图前后的统一校验
//! - `bitmap` / `trim`：RGBA 位图与透明边界裁剪
//! - `encoder` / `artifact`：PNG 编码与导出产物
//! - `sink` / `clipboard_writer`：文件落盘、剪贴板写入与用户通知
//! - `dispatcher`：编排整条链路
//! - `config` / `error`：配置与错误
//!
//! ## 新同事快速上手
//!
//! ```text
//! 宿主（CLI / 界面按钮）
//!    ↓
//! dispatcher.rs（配置快照 + 进行中保护 + 阶段耗时日志）
//!    ├─ renderer.rs → surface.rs / scene.rs（截图）
//!    ├─ trim.rs（裁剪透明边）
//!    ├─ encoder.rs（PNG）
//!    └─ sink.rs / clipboard_writer.rs（输出 + 通知）
//!    ↓
//! PathBuf / CopyOutcome 返回给宿主
//! ```

mod artifact;
mod bitmap;
mod clipboard_writer;
mod config;
mod dispatcher;
mod encoder;
mod error;
mod renderer;
mod scene;
mod sink;
mod surface;
mod trim;

pub use artifact::{ClipboardPayload, ExportArtifact, FileArtifact, PNG_MIME_TYPE, SinkKind};
pub use bitmap::{Bitmap, InkBounds};
pub use clipboard_writer::{
    ClipboardBackend, ClipboardFailureKind, ClipboardWriteFailure, ClipboardWriter, SystemClipboard,
};
pub use config::{
    DEFAULT_FILE_NAME, DEFAULT_NARROW_BREAKPOINT_PX, EmptyCapturePolicy, ExportConfig,
    PngCompression, ScalePolicy,
};
pub use dispatcher::{ClipboardExport, CopyOutcome, ExportDispatcher};
pub use encoder::encode_png;
pub use error::ExportError;
pub use renderer::{CaptureRequest, SnapshotRenderer};
pub use scene::{LogicalRect, NodeRole, Paint, SceneNode, SceneSurface};
pub use sink::{DownloadDirSink, ExportNotifier, FileSink, LogNotifier, claim_unique_path};
pub use surface::{Background, CaptureSurface, LogicalSize, ViewportSignal};
pub use trim::{ink_bounds, trim};
