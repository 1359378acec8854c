//! # 合并流程
//!
//! 一次合并的完整步骤：
//! 1. 输入列表为空时立即失败，不读取任何文件
//! 2. 报告合并模式
//! 3. 依次读取每个输入并折叠进累积体系；任何一个读取失败都中止整个合并，
//!    错误中带上出错文件的序号和路径，此时不会写出任何文件
//! 4. 对合并结果应用一次后处理选项
//! 5. 写出一次
//!
//! 读取与写出通过 `SystemSource` / `SystemSink` 抽象，便于测试时替换。
//!
//! ## 依赖关系
//! - 被 `commands/merge.rs`, `commands/convert.rs` 调用
//! - 使用 `merge/fold.rs`, `merge/notify.rs`, `options/`

use super::fold::Merger;
use super::mode::MergeMode;
use super::notify::{Notice, Notifier};
use crate::error::{QmergeError, Result};
use crate::models::System;
use crate::options::{apply_options, SystemOption};

use std::path::{Path, PathBuf};

/// 体系读取源
pub trait SystemSource {
    fn load(&mut self, path: &Path) -> Result<System>;
}

/// 合并结果写出目标，返回实际写出的文件
pub trait SystemSink {
    fn write(&mut self, system: &System, notifier: &mut dyn Notifier) -> Result<Vec<PathBuf>>;
}

/// 一次合并请求
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest<'a> {
    pub mode: MergeMode,
    pub inputs: &'a [PathBuf],
    pub options: &'a [SystemOption],
}

/// 单个输入的统计
#[derive(Debug, Clone, PartialEq)]
pub struct InputSummary {
    pub index: usize,
    pub path: PathBuf,
    pub formula: String,
    pub particles: usize,
    pub shells: usize,
    pub properties: usize,
}

/// 合并结果汇总
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub systems: usize,
    pub inputs: Vec<InputSummary>,
    pub particles: usize,
    pub shells: usize,
    pub properties: Vec<String>,
    pub written: Vec<PathBuf>,
    pub warnings: usize,
}

/// 转发通知并统计警告数
struct Tally<'a> {
    inner: &'a mut dyn Notifier,
    warnings: usize,
}

impl Notifier for Tally<'_> {
    fn notify(&mut self, notice: Notice) {
        if notice.is_warning() {
            self.warnings += 1;
        }
        self.inner.notify(notice);
    }
}

/// 执行合并
pub fn merge_files(
    request: MergeRequest<'_>,
    source: &mut dyn SystemSource,
    sink: &mut dyn SystemSink,
    notifier: &mut dyn Notifier,
) -> Result<MergeReport> {
    if request.inputs.is_empty() {
        return Err(QmergeError::EmptyInputList);
    }

    let mut tally = Tally {
        inner: notifier,
        warnings: 0,
    };
    tally.notify(Notice::Mode(request.mode));

    let mut merger = Merger::new(request.mode);
    let mut inputs = Vec::with_capacity(request.inputs.len());

    for (i, path) in request.inputs.iter().enumerate() {
        let index = i + 1;
        tally.notify(Notice::Loading {
            index,
            path: path.clone(),
        });

        let system = source
            .load(path)
            .and_then(check_consistency)
            .map_err(|e| QmergeError::ReadFailure {
                index,
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        let summary = InputSummary {
            index,
            path: path.clone(),
            formula: system.formula(),
            particles: system.atoms.len(),
            shells: system.shell_count(),
            properties: system.auxiliary.ncols(),
        };
        tally.notify(Notice::Loaded {
            index,
            particles: summary.particles,
            shells: summary.shells,
            properties: summary.properties,
        });
        inputs.push(summary);

        merger.fold(system, &mut tally);
    }

    let systems = merger.systems();
    let merged = apply_options(merger.finish(), request.options, &mut tally)?;
    let written = sink.write(&merged, &mut tally)?;

    Ok(MergeReport {
        systems,
        inputs,
        particles: merged.atoms.len(),
        shells: merged.shell_count(),
        properties: merged.auxiliary.names().to_vec(),
        written,
        warnings: tally.warnings,
    })
}

/// 读取结果必须满足：壳层序列与辅助属性表都与粒子逐一对应
fn check_consistency(system: System) -> Result<System> {
    let n = system.atoms.len();
    let format = system.source_format.clone().unwrap_or_default();

    if system.auxiliary.nrows() != n {
        return Err(QmergeError::parse(
            &format,
            &system.name,
            format!(
                "{} auxiliary rows for {} particles",
                system.auxiliary.nrows(),
                n
            ),
        ));
    }

    if let Some(shells) = &system.shells {
        if shells.len() != n {
            return Err(QmergeError::parse(
                &format,
                &system.name,
                format!("{} shell slots for {} particles", shells.len(), n),
            ));
        }
    }

    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::notify::NoticeLog;
    use crate::models::{Atom, Lattice, SYS_ID};
    use std::collections::HashMap;

    /// 内存中的读取源，记录调用次数
    #[derive(Default)]
    struct MemorySource {
        systems: HashMap<PathBuf, System>,
        loads: usize,
    }

    impl MemorySource {
        fn with(mut self, name: &str, system: System) -> Self {
            self.systems.insert(PathBuf::from(name), system);
            self
        }
    }

    impl SystemSource for MemorySource {
        fn load(&mut self, path: &Path) -> Result<System> {
            self.loads += 1;
            self.systems
                .get(path)
                .cloned()
                .ok_or_else(|| QmergeError::FileNotFound {
                    path: path.display().to_string(),
                })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Vec<System>,
    }

    impl SystemSink for MemorySink {
        fn write(&mut self, system: &System, _notifier: &mut dyn Notifier) -> Result<Vec<PathBuf>> {
            self.written.push(system.clone());
            Ok(vec![PathBuf::from("merged.xyz")])
        }
    }

    fn block(a: f64, n: usize) -> System {
        let atoms = (0..n).map(|i| Atom::new("C", [i as f64, 0.5, 0.5])).collect();
        System::new("block", Lattice::orthorhombic(a, 10.0, 10.0), atoms)
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_empty_input_list_aborts_before_loading() {
        let mut source = MemorySource::default();
        let mut sink = MemorySink::default();
        let mut log = NoticeLog::new();
        let request = MergeRequest {
            mode: MergeMode::Stack,
            inputs: &[],
            options: &[],
        };

        let err = merge_files(request, &mut source, &mut sink, &mut log).unwrap_err();

        assert!(matches!(err, QmergeError::EmptyInputList));
        assert_eq!(source.loads, 0);
        assert!(sink.written.is_empty());
        assert!(log.notices.is_empty());
    }

    #[test]
    fn test_read_failure_on_second_input_writes_nothing() {
        let mut source = MemorySource::default()
            .with("a.xyz", block(10.0, 2))
            .with("c.xyz", block(10.0, 2));
        let mut sink = MemorySink::default();
        let mut log = NoticeLog::new();
        let inputs = paths(&["a.xyz", "b.xyz", "c.xyz"]);
        let request = MergeRequest {
            mode: MergeMode::Concatenate(0),
            inputs: &inputs,
            options: &[],
        };

        let err = merge_files(request, &mut source, &mut sink, &mut log).unwrap_err();

        match err {
            QmergeError::ReadFailure { index, path, .. } => {
                assert_eq!(index, 2);
                assert_eq!(path, "b.xyz");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(source.loads, 2);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_inconsistent_input_is_a_read_failure() {
        let mut bad = block(10.0, 2);
        bad.shells = Some(vec![None]);
        let mut source = MemorySource::default().with("bad.gin", bad);
        let mut sink = MemorySink::default();
        let mut log = NoticeLog::new();
        let inputs = paths(&["bad.gin"]);
        let request = MergeRequest {
            mode: MergeMode::Stack,
            inputs: &inputs,
            options: &[],
        };

        let err = merge_files(request, &mut source, &mut sink, &mut log).unwrap_err();
        assert!(matches!(err, QmergeError::ReadFailure { index: 1, .. }));
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_merge_two_blocks_along_x() {
        let mut a = block(10.0, 3);
        a.auxiliary
            .insert_column("charge", vec![1.0, -2.0, 0.5])
            .unwrap();
        let b = block(5.0, 2);

        let mut source = MemorySource::default().with("a.xyz", a).with("b.xyz", b);
        let mut sink = MemorySink::default();
        let mut log = NoticeLog::new();
        let inputs = paths(&["a.xyz", "b.xyz"]);
        let request = MergeRequest {
            mode: MergeMode::from_char('x'),
            inputs: &inputs,
            options: &[],
        };

        let report = merge_files(request, &mut source, &mut sink, &mut log).unwrap();

        assert_eq!(report.systems, 2);
        assert_eq!(report.particles, 5);
        assert_eq!(report.shells, 0);
        assert_eq!(report.inputs[0].formula, "C3");
        assert_eq!(report.properties, vec!["charge".to_string(), SYS_ID.to_string()]);
        assert_eq!(report.inputs.len(), 2);
        assert_eq!(report.inputs[0].properties, 1);
        assert_eq!(report.inputs[1].particles, 2);
        assert_eq!(report.written, vec![PathBuf::from("merged.xyz")]);
        assert_eq!(report.warnings, 0);

        assert_eq!(sink.written.len(), 1);
        let merged = &sink.written[0];
        assert_eq!(merged.lattice.row(0), [15.0, 0.0, 0.0]);
        assert_eq!(merged.atoms[3].position, [10.0, 0.5, 0.5]);
        assert_eq!(
            merged.auxiliary.column(SYS_ID).unwrap(),
            vec![1.0, 1.0, 1.0, 2.0, 2.0]
        );
        assert_eq!(
            merged.auxiliary.column("charge").unwrap(),
            vec![1.0, -2.0, 0.5, 0.0, 0.0]
        );

        assert_eq!(log.notices[0], Notice::Mode(MergeMode::Concatenate(0)));
    }

    #[test]
    fn test_options_applied_once_before_write() {
        let mut source = MemorySource::default()
            .with("a.xyz", block(10.0, 1))
            .with("b.xyz", block(10.0, 2));
        let mut sink = MemorySink::default();
        let mut log = NoticeLog::new();
        let inputs = paths(&["a.xyz", "b.xyz"]);
        let options = [
            SystemOption::SelectSystems(vec![2]),
            SystemOption::RemoveProperty("missing".to_string()),
        ];
        let request = MergeRequest {
            mode: MergeMode::Stack,
            inputs: &inputs,
            options: &options,
        };

        let report = merge_files(request, &mut source, &mut sink, &mut log).unwrap();

        assert_eq!(report.particles, 2);
        assert_eq!(report.warnings, 1);
        let applied = log
            .notices
            .iter()
            .filter(|n| matches!(n, Notice::OptionApplied(_)))
            .count();
        assert_eq!(applied, 1);
    }
}
