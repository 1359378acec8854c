//! # qmerge - 原子结构文件合并工具
//!
//! 把多个结构文件依次合并为一个体系，可沿 x/y/z 方向拼接模拟盒子，
//! 统一各输入的逐原子辅助属性并记录每个原子来自哪个输入 (`sysID`)。
//!
//! ## 子命令
//! - `merge`   - 合并多个结构文件
//! - `convert` - 单个文件经同一流程转换格式
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── merge/     (合并引擎)
//!   │     ├── options/   (合并后处理)
//!   │     ├── parsers/   (格式读写)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod cli;
mod commands;
mod error;
mod merge;
mod models;
mod options;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&error::describe(&e));
        std::process::exit(1);
    }
}
