//! # convert 命令实现
//!
//! 单个输入、不拼接的合并流程：读入后同样追加 `sysID`，
//! 并可使用全部后处理选项，再按请求的格式写出。
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 复用 `commands/merge.rs` 的流程
//! - 使用 `utils/output.rs`

use super::merge::run_pipeline;
use crate::cli::convert::ConvertArgs;
use crate::error::{QmergeError, Result};
use crate::merge::{MergeMode, Verbosity};
use crate::utils::output;

/// 执行 convert 命令
pub fn execute(args: ConvertArgs) -> Result<()> {
    let verbosity = args.output.effective_verbosity();

    if !args.input.exists() {
        return Err(QmergeError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let formats: Vec<String> = args
        .output
        .resolved_formats()
        .iter()
        .map(|f| f.to_string())
        .collect();

    if verbosity > Verbosity::Quiet {
        output::print_header(&format!("Converting to {} format", formats.join(", ")));
    }

    let report = run_pipeline(MergeMode::Stack, &[args.input.clone()], &args.output)?;

    if verbosity > Verbosity::Quiet {
        output::print_done(&format!(
            "Converted '{}': {} particles, {} file(s) written ({} skipped)",
            args.input.display(),
            report.particles,
            report.written.len(),
            formats.len() - report.written.len()
        ));
    }

    Ok(())
}
