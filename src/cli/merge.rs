//! # merge 子命令 CLI 定义
//!
//! 合并多个结构文件，可选沿 x/y/z 拼接盒子。
//! 写出与后处理相关的参数放在 `OutputArgs` 中，与 `convert` 共用。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/convert.rs` 使用
//! - 参数传递给 `commands/merge.rs`

use crate::merge::Verbosity;
use crate::options::{parse_vector, SystemOption};
use crate::parsers::Format;

use clap::Args;
use std::path::PathBuf;

/// merge 子命令参数
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Concatenation direction: x, y or z (anything else stacks without concatenation)
    pub direction: String,

    /// Input structure files (glob patterns are expanded)
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// 写出、后处理与输出控制参数
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output file (the extension is replaced for each format)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output formats, comma separated [default: from output name, else xyz]
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub formats: Vec<Format>,

    /// Force the input format instead of detecting it from file names
    #[arg(long, value_enum)]
    pub input_format: Option<Format>,

    /// Translate every particle and shell by "x,y,z"
    #[arg(long, value_parser = parse_vector, allow_hyphen_values = true)]
    pub shift: Option<[f64; 3]>,

    /// Wrap particles back into the box (applied after --shift)
    #[arg(long, default_value_t = false)]
    pub wrap: bool,

    /// Remove an auxiliary property column (repeatable)
    #[arg(long = "remove-property", value_name = "NAME")]
    pub remove_property: Vec<String>,

    /// Keep only particles from these input systems (1-based, comma separated)
    #[arg(long = "select-sys", value_delimiter = ',', value_name = "IDS")]
    pub select_sys: Vec<usize>,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Output verbosity
    #[arg(long, value_enum, env = "QMERGE_VERBOSITY", default_value_t = Verbosity::Normal)]
    pub verbosity: Verbosity,

    /// Shortcut for --verbosity verbose
    #[arg(short, long, default_value_t = false, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Shortcut for --verbosity quiet
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

impl OutputArgs {
    /// 请求的输出格式；未指定时由输出文件名推断，否则为 xyz
    pub fn resolved_formats(&self) -> Vec<Format> {
        if !self.formats.is_empty() {
            let mut formats: Vec<Format> = Vec::with_capacity(self.formats.len());
            for format in &self.formats {
                if !formats.contains(format) {
                    formats.push(*format);
                }
            }
            return formats;
        }
        vec![Format::detect(&self.output).unwrap_or(Format::Xyz)]
    }

    /// 后处理选项，顺序为 shift, wrap, remove-property, select-sys
    pub fn system_options(&self) -> Vec<SystemOption> {
        let mut options = Vec::new();
        if let Some(v) = self.shift {
            options.push(SystemOption::Shift(v));
        }
        if self.wrap {
            options.push(SystemOption::Wrap);
        }
        for name in &self.remove_property {
            options.push(SystemOption::RemoveProperty(name.clone()));
        }
        if !self.select_sys.is_empty() {
            options.push(SystemOption::SelectSystems(self.select_sys.clone()));
        }
        options
    }

    pub fn effective_verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            self.verbosity
        }
    }
}
