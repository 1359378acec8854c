//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `merge`: 合并多个结构文件，可沿某轴拼接
//! - `convert`: 单个结构文件格式转换
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: merge, convert

pub mod convert;
pub mod merge;

use clap::{Parser, Subcommand};

/// qmerge - 原子结构文件合并工具
#[derive(Parser)]
#[command(name = "qmerge")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Merge atomic structure files, optionally concatenating boxes", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Merge structure files into one system (direction x/y/z concatenates boxes)
    Merge(merge::MergeArgs),

    /// Convert one structure file through the same pipeline
    Convert(convert::ConvertArgs),
}
