//! # 统一错误处理模块
//!
//! 定义 qmerge 的所有错误类型，使用 `thiserror` 派生。
//! 所有错误对一次合并操作都是致命的，不做重试。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qmerge 统一错误类型
#[derive(Error, Debug)]
pub enum QmergeError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 合并错误
    // ─────────────────────────────────────────────────────────────
    #[error("No input files were given, nothing to merge")]
    EmptyInputList,

    #[error("Could not load input #{index} ({path}), merge aborted")]
    ReadFailure {
        index: usize,
        path: String,
        #[source]
        source: Box<QmergeError>,
    },

    #[error("Could not write output {path}")]
    WriteFailure {
        path: String,
        #[source]
        source: Box<QmergeError>,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Option '{option}' failed: {reason}")]
    InvalidOption { option: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl QmergeError {
    /// 构造解析错误的便捷函数
    pub fn parse(format: &str, path: &str, reason: impl Into<String>) -> Self {
        QmergeError::ParseError {
            format: format.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QmergeError>;

/// 错误及其完整的原因链，每层一行
pub fn describe(err: &QmergeError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}
