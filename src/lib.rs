//! # 文字卡片导出：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        宿主（卡片预览渲染 / 主题 / 文本编辑，不在本库）       │
//! │                 ↓ CaptureSurface + ViewportSignal         │
//! └───────────────────────┼──────────────────────────────────┘
//! ┌───────────────────────┼──────────────────────────────────┐
//! │                       ↓          本库 (Rust)              │
//! │  ┌─ export ─── ExportDispatcher                           │
//! │  │   ├─ renderer / surface / scene   截图                 │
//! │  │   ├─ trim / bitmap                透明边裁剪            │
//! │  │   ├─ encoder / artifact           PNG 编码             │
//! │  │   └─ sink / clipboard_writer      下载文件 / 剪贴板     │
//! │  │                                                        │
//! │  ├─ error ──── AppError (统一错误类型)                     │
//! │  ├─ settings ─ JSON 设置文件 → ExportConfig                │
//! │  └─ storage ── 下载目录解析与创建                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`export`] | 截图 → 裁剪 → 编码 → 输出 的完整链路 |
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 设置文件读取、叠加默认值与写回 |
//! | [`storage`] | 下载目录的获取与自动创建 |

pub mod error;
pub mod export;
pub mod settings;
pub mod storage;
