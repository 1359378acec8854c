//! # 合并引擎模块
//!
//! 把多个结构文件依次折叠为一个体系：
//! - `mode`: 合并模式（叠放或沿某轴拼接）
//! - `fold`: 单步折叠与辅助属性表统一
//! - `engine`: 读取 → 折叠 → 选项 → 写出 的完整流程
//! - `io`: 基于文件的读取源与写出目标
//! - `notify`: 进度与诊断通知
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/`, `parsers/`, `options/`

pub mod engine;
pub mod fold;
pub mod io;
pub mod mode;
pub mod notify;

pub use engine::{merge_files, InputSummary, MergeReport, MergeRequest, SystemSink, SystemSource};
pub use fold::Merger;
pub use io::{FileSink, FileSource};
pub use mode::MergeMode;
pub use notify::{ConsoleNotifier, Notice, NoticeLog, Notifier, Verbosity};
