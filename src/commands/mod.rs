//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `merge/`, `utils/`
//! - 子模块: merge, convert

pub mod convert;
pub mod merge;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Merge(args) => merge::execute(args),
        Commands::Convert(args) => convert::execute(args),
    }
}
