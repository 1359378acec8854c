//! # convert 子命令 CLI 定义
//!
//! 单个结构文件的格式转换，走与 merge 相同的流程（单输入、不拼接）。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use super::merge::OutputArgs;

use clap::Args;
use std::path::PathBuf;

/// convert 子命令参数
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input structure file
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}
