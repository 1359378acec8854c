//! # 基于文件的读取与写出
//!
//! - `FileSource`: 按文件名（或强制指定的格式）读取结构文件
//! - `FileSink`: 把合并结果按请求的每种格式写出一次
//!
//! 写出规则：
//! - 文件名由 `Format::output_path` 决定
//! - 目标文件已存在且未指定覆盖时跳过，并以警告报告
//! - 格式无法保存体系中的壳层或辅助属性（`sysID` 除外）时给出警告，照常写出
//! - 先把每种格式写入同目录的临时文件，全部成功后再改名为目标文件；
//!   任何一步失败都清理已写的文件并返回 `WriteFailure`
//!
//! ## 依赖关系
//! - 被 `commands/merge.rs` 使用
//! - 使用 `parsers/`

use super::engine::{SystemSink, SystemSource};
use super::notify::{Notice, Notifier};
use crate::error::{QmergeError, Result};
use crate::models::{System, SYS_ID};
use crate::parsers::{read_structure_file, write_structure_file, Format};

use std::fs;
use std::path::{Path, PathBuf};

/// 从磁盘读取结构文件
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource {
    /// 强制输入格式；None 时由文件名推断
    pub format: Option<Format>,
}

impl FileSource {
    pub fn new(format: Option<Format>) -> Self {
        FileSource { format }
    }
}

impl SystemSource for FileSource {
    fn load(&mut self, path: &Path) -> Result<System> {
        read_structure_file(path, self.format)
    }
}

/// 写出到磁盘
#[derive(Debug, Clone)]
pub struct FileSink {
    output: PathBuf,
    formats: Vec<Format>,
    overwrite: bool,
}

impl FileSink {
    pub fn new(output: impl Into<PathBuf>, formats: Vec<Format>, overwrite: bool) -> Self {
        FileSink {
            output: output.into(),
            formats,
            overwrite,
        }
    }

    /// 每种格式对应的输出路径
    pub fn targets(&self) -> Vec<(Format, PathBuf)> {
        self.formats
            .iter()
            .map(|f| (*f, f.output_path(&self.output)))
            .collect()
    }
}

impl SystemSink for FileSink {
    fn write(&mut self, system: &System, notifier: &mut dyn Notifier) -> Result<Vec<PathBuf>> {
        let mut pending = Vec::new();

        for (format, path) in self.targets() {
            if path.exists() && !self.overwrite {
                notifier.notify(Notice::Skipped(path));
                continue;
            }

            if system.shell_count() > 0 && !format.supports_shells() {
                notifier.notify(Notice::Warning(format!(
                    "{} cannot store shells, {} shells dropped from {}",
                    format,
                    system.shell_count(),
                    path.display()
                )));
            }
            let lost = lost_properties(system);
            if !lost.is_empty() && !format.supports_auxiliary() {
                notifier.notify(Notice::Warning(format!(
                    "{} cannot store auxiliary properties ({}) in {}",
                    format,
                    lost.join(", "),
                    path.display()
                )));
            }

            pending.push((format, path));
        }

        // 全部写入临时文件后再改名，任何一步失败都不留下输出
        let staged = stage(&pending, system)?;
        commit(&pending, &staged)?;

        let mut written = Vec::with_capacity(pending.len());
        for (format, path) in pending {
            notifier.notify(Notice::Written {
                path: path.clone(),
                format: format.to_string(),
            });
            written.push(path);
        }

        Ok(written)
    }
}

/// 除 sysID 以外的辅助属性；sysID 由合并生成，不计入丢失
fn lost_properties(system: &System) -> Vec<&str> {
    system
        .auxiliary
        .names()
        .iter()
        .map(String::as_str)
        .filter(|name| *name != SYS_ID)
        .collect()
}

/// `dir/merged.xyz` -> `dir/.merged.xyz.partial`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

fn write_failure(path: &Path, source: QmergeError) -> QmergeError {
    QmergeError::WriteFailure {
        path: path.display().to_string(),
        source: Box::new(source),
    }
}

fn stage(pending: &[(Format, PathBuf)], system: &System) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(pending.len());

    for (format, path) in pending {
        let tmp = staging_path(path);
        if let Err(e) = write_structure_file(&tmp, *format, system) {
            discard(&staged);
            discard(std::slice::from_ref(&tmp));
            return Err(write_failure(path, e));
        }
        staged.push(tmp);
    }

    Ok(staged)
}

fn commit(pending: &[(Format, PathBuf)], staged: &[PathBuf]) -> Result<()> {
    for (i, ((_, path), tmp)) in pending.iter().zip(staged).enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            discard(&staged[i..]);
            let committed: Vec<PathBuf> = pending[..i].iter().map(|(_, p)| p.clone()).collect();
            discard(&committed);
            return Err(write_failure(
                path,
                QmergeError::FileWriteError {
                    path: path.display().to_string(),
                    source: e,
                },
            ));
        }
    }
    Ok(())
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::notify::NoticeLog;
    use crate::models::{Atom, Lattice};

    fn sample() -> System {
        let mut system = System::new(
            "sample",
            Lattice::orthorhombic(5.0, 5.0, 5.0),
            vec![Atom::new("O", [0.0, 0.0, 0.0]), Atom::new("O", [1.2, 0.0, 0.0])],
        );
        system.shells = Some(vec![Some(Atom::new("O", [0.0, 0.0, 0.1])), None]);
        system
            .auxiliary
            .insert_column(SYS_ID, vec![1.0, 2.0])
            .unwrap();
        system
    }

    #[test]
    fn test_file_sink_writes_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.xyz");
        let mut sink = FileSink::new(&output, vec![Format::Xyz, Format::Gin], false);
        let mut log = NoticeLog::new();

        let written = sink.write(&sample(), &mut log).unwrap();

        assert_eq!(
            written,
            vec![dir.path().join("merged.xyz"), dir.path().join("merged.gin")]
        );
        assert!(written.iter().all(|p| p.exists()));
        // 只有 xyz 丢壳层；sysID 不算丢失的属性
        assert_eq!(log.warnings(), 1);
        assert!(!dir.path().join(".merged.xyz.partial").exists());

        let back = read_structure_file(&written[1], None).unwrap();
        assert_eq!(back.shell_count(), 1);
    }

    #[test]
    fn test_file_sink_skips_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.cell");
        fs::write(&output, "keep me").unwrap();

        let mut sink = FileSink::new(&output, vec![Format::Cell], false);
        let mut log = NoticeLog::new();
        let written = sink.write(&sample(), &mut log).unwrap();

        assert!(written.is_empty());
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
        assert!(log.notices.contains(&Notice::Skipped(output.clone())));

        let mut sink = FileSink::new(&output, vec![Format::Cell], true);
        let written = sink.write(&sample(), &mut log).unwrap();
        assert_eq!(written, vec![output.clone()]);
        assert!(fs::read_to_string(&output).unwrap().contains("LATTICE_CART"));
    }

    #[test]
    fn test_file_sink_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("merged.xyz");
        let mut sink = FileSink::new(&output, vec![Format::Xyz], false);
        let mut log = NoticeLog::new();

        let err = sink.write(&sample(), &mut log).unwrap_err();
        assert!(matches!(err, QmergeError::WriteFailure { .. }));
    }

    #[test]
    fn test_lost_properties_warn_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.res");
        let mut system = sample();
        system.shells = None;
        system.auxiliary.insert_column("charge", vec![0.5, -0.5]).unwrap();

        let mut sink = FileSink::new(&output, vec![Format::Res], false);
        let mut log = NoticeLog::new();
        sink.write(&system, &mut log).unwrap();

        let warnings: Vec<&Notice> = log.notices.iter().filter(|n| n.is_warning()).collect();
        assert_eq!(
            warnings,
            vec![&Notice::Warning(format!(
                "res cannot store auxiliary properties (charge) in {}",
                output.display()
            ))]
        );
    }

    #[test]
    fn test_failed_format_leaves_no_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.xyz");
        fs::create_dir(dir.path().join("merged.gin")).unwrap();

        let mut sink = FileSink::new(&output, vec![Format::Xyz, Format::Gin], true);
        let mut log = NoticeLog::new();
        let err = sink.write(&sample(), &mut log).unwrap_err();

        assert!(matches!(err, QmergeError::WriteFailure { .. }));
        assert!(!output.exists());
        assert!(!dir.path().join(".merged.xyz.partial").exists());
        assert!(!dir.path().join(".merged.gin.partial").exists());
        assert!(!log
            .notices
            .iter()
            .any(|n| matches!(n, Notice::Written { .. })));
    }

    #[test]
    fn test_file_source_with_forced_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structure.txt");
        fs::write(&path, "1\nsingle atom\nHe 0.0 0.0 0.0\n").unwrap();

        assert!(FileSource::default().load(&path).is_err());

        let system = FileSource::new(Some(Format::Xyz)).load(&path).unwrap();
        assert_eq!(system.atoms.len(), 1);
        assert_eq!(system.atoms[0].element, "He");
    }
}
