//! # 合并过程通知
//!
//! 合并引擎通过 `Notifier` 报告进度与诊断信息。通知只用于输出，
//! 不参与控制流。
//!
//! ## 依赖关系
//! - 被 `merge/engine.rs`, `merge/fold.rs`, `options/` 使用
//! - `ConsoleNotifier` 使用 `utils/output.rs` 与 `indicatif` 进度条

use super::mode::MergeMode;
use crate::utils::output;

use clap::ValueEnum;
use indicatif::ProgressBar;
use std::path::PathBuf;

/// 通知内容
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// 选定的合并模式
    Mode(MergeMode),
    /// 开始读取第 `index` 个输入
    Loading { index: usize, path: PathBuf },
    /// 读取完成
    Loaded {
        index: usize,
        particles: usize,
        shells: usize,
        properties: usize,
    },
    /// 属性已存在于合并结果中
    PropertyExisting(String),
    /// 新属性
    PropertyNew(String),
    /// 第 `index` 个体系已并入，合并结果共 `total` 个粒子
    Merged { index: usize, total: usize },
    /// 选项已应用
    OptionApplied(String),
    /// 文件已写出
    Written { path: PathBuf, format: String },
    /// 文件已存在而跳过
    Skipped(PathBuf),
    /// 警告
    Warning(String),
}

impl Notice {
    /// 是否为警告类通知
    pub fn is_warning(&self) -> bool {
        matches!(self, Notice::Warning(_) | Notice::Skipped(_))
    }
}

/// 通知接收者
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// 输出详细程度
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Only warnings and errors
    Quiet,
    /// Normal progress messages
    #[default]
    Normal,
    /// Also report every auxiliary property
    Verbose,
}

/// 终端通知器
pub struct ConsoleNotifier {
    verbosity: Verbosity,
    progress: Option<ProgressBar>,
}

impl ConsoleNotifier {
    pub fn new(verbosity: Verbosity) -> Self {
        ConsoleNotifier {
            verbosity,
            progress: None,
        }
    }

    /// 附加进度条，每并入一个体系前进一格
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    /// 结束并清除进度条
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }

    fn emit(&self, print: impl FnOnce()) {
        match &self.progress {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        if let Notice::Merged { .. } = notice {
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        let quiet = self.verbosity == Verbosity::Quiet;
        let verbose = self.verbosity >= Verbosity::Verbose;

        match notice {
            Notice::Warning(msg) => self.emit(|| output::print_warning(&msg)),
            Notice::Skipped(path) => self.emit(|| {
                output::print_warning(&format!(
                    "'{}' already exists, skipped (use --overwrite)",
                    path.display()
                ))
            }),
            _ if quiet => {}
            Notice::Mode(mode) => self.emit(|| output::print_info(&format!("Merge mode: {}", mode))),
            Notice::Loading { index, path } if verbose => {
                self.emit(|| output::print_info(&format!("Reading #{}: {}", index, path.display())))
            }
            Notice::Loaded {
                index,
                particles,
                shells,
                properties,
            } if verbose => self.emit(|| {
                output::print_info(&format!(
                    "#{}: {} particles, {} shells, {} auxiliary properties",
                    index, particles, shells, properties
                ))
            }),
            Notice::PropertyExisting(name) if verbose => {
                self.emit(|| output::print_skip(&format!("Property '{}' already exists", name)))
            }
            Notice::PropertyNew(name) if verbose => {
                self.emit(|| output::print_info(&format!("New property '{}'", name)))
            }
            Notice::OptionApplied(desc) => {
                self.emit(|| output::print_info(&format!("Applied option: {}", desc)))
            }
            Notice::Written { path, format } => {
                self.emit(|| output::print_conversion(&format, &path.display().to_string()))
            }
            _ => {}
        }
    }
}

/// 记录所有通知（测试与汇总用）
#[derive(Debug, Default)]
pub struct NoticeLog {
    pub notices: Vec<Notice>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> usize {
        self.notices.iter().filter(|n| n.is_warning()).count()
    }
}

impl Notifier for NoticeLog {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
