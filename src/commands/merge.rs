//! # merge 命令实现
//!
//! ## 功能
//! - 展开输入中的 glob 模式
//! - 按方向参数选择合并模式
//! - 读取、折叠、应用选项、写出（见 `merge/engine.rs`）
//! - 打印每个输入的统计表
//!
//! ## 依赖关系
//! - 使用 `cli/merge.rs` 定义的参数
//! - 使用 `merge/`, `parsers/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::merge::{MergeArgs, OutputArgs};
use crate::error::{QmergeError, Result};
use crate::merge::{
    merge_files, ConsoleNotifier, FileSink, FileSource, MergeMode, MergeReport, MergeRequest,
    Verbosity,
};
use crate::utils::{output, progress};

use std::path::PathBuf;
use tabled::{Table, Tabled};

/// 输入统计行
#[derive(Debug, Clone, Tabled)]
struct InputRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Formula")]
    formula: String,
    #[tabled(rename = "Particles")]
    particles: usize,
    #[tabled(rename = "Shells")]
    shells: usize,
    #[tabled(rename = "Properties")]
    properties: usize,
}

/// 执行 merge 命令
pub fn execute(args: MergeArgs) -> Result<()> {
    let verbosity = args.output.effective_verbosity();
    if verbosity > Verbosity::Quiet {
        output::print_header("Merging structure files");
    }

    let inputs = expand_inputs(&args.inputs)?;
    let mode = MergeMode::from_arg(&args.direction);

    let report = run_pipeline(mode, &inputs, &args.output)?;

    if verbosity > Verbosity::Quiet {
        print_summary(&report);
        output::print_done(&format!(
            "Merged {} system(s): {} particles, {} shells, {} file(s) written ({} warning(s))",
            report.systems,
            report.particles,
            report.shells,
            report.written.len(),
            report.warnings
        ));
    }

    Ok(())
}

/// 读取 → 合并 → 选项 → 写出，merge 与 convert 共用
pub(crate) fn run_pipeline(
    mode: MergeMode,
    inputs: &[PathBuf],
    args: &OutputArgs,
) -> Result<MergeReport> {
    let verbosity = args.effective_verbosity();
    let options = args.system_options();

    let mut notifier = ConsoleNotifier::new(verbosity);
    if verbosity > Verbosity::Quiet && inputs.len() > 1 {
        let pb = progress::create_progress_bar(inputs.len() as u64, "Merging");
        notifier = notifier.with_progress(pb);
    }

    let mut source = FileSource::new(args.input_format);
    let mut sink = FileSink::new(&args.output, args.resolved_formats(), args.overwrite);

    let request = MergeRequest {
        mode,
        inputs,
        options: &options,
    };
    let result = merge_files(request, &mut source, &mut sink, &mut notifier);
    notifier.finish();

    result
}

/// 展开 glob 模式；不含通配符的参数原样保留
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        if !is_glob(pattern) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let paths = glob::glob(pattern).map_err(|e| {
            QmergeError::InvalidArgument(format!("Invalid pattern '{}': {}", pattern, e))
        })?;

        let mut matched: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
        if matched.is_empty() {
            return Err(QmergeError::NoFilesFound {
                pattern: pattern.clone(),
            });
        }

        matched.sort();
        files.extend(matched);
    }

    Ok(files)
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn print_summary(report: &MergeReport) {
    let rows: Vec<InputRow> = report
        .inputs
        .iter()
        .map(|s| InputRow {
            index: s.index,
            file: s.path.display().to_string(),
            formula: s.formula.clone(),
            particles: s.particles,
            shells: s.shells,
            properties: s.properties,
        })
        .collect();

    output::print_header("Inputs");
    println!("{}", Table::new(&rows));

    if !report.properties.is_empty() {
        output::print_info(&format!(
            "Auxiliary properties: {}",
            report.properties.join(", ")
        ));
    }
}
