//! # 进度条工具
//!
//! 封装 `indicatif` 提供统一的进度条样式。合并时每并入一个输入前进一格，
//! 期间的输出经 `ProgressBar::suspend` 打印，避免与进度条交错。
//!
//! ## 依赖关系
//! - 被 `commands/merge.rs` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};

/// 创建标准进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
