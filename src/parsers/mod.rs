//! # 解析器模块
//!
//! 提供各种结构文件格式的读取与写出。
//!
//! | 格式 | 读 | 写 | 壳层 | 辅助属性 |
//! |------|----|----|------|----------|
//! | 扩展 XYZ | ✓ | ✓ | | ✓ |
//! | POSCAR | ✓ | ✓ | | |
//! | CASTEP .cell | ✓ | ✓ | | |
//! | AIRSS .res | ✓ | ✓ | | |
//! | GULP .gin | ✓ | ✓ | ✓ | |
//! | CSV | | ✓ | ✓ | ✓ |
//!
//! ## 依赖关系
//! - 被 `merge/io.rs` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: xyz, poscar, cell, res, gin, table

pub mod cell;
pub mod gin;
pub mod poscar;
pub mod res;
pub mod table;
pub mod xyz;

use crate::error::{QmergeError, Result};
use crate::models::System;

use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

/// 支持的结构文件格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Format {
    /// Extended XYZ (auxiliary properties as extra columns)
    Xyz,
    /// VASP POSCAR format
    Poscar,
    /// CASTEP .cell format
    Cell,
    /// AIRSS .res format
    Res,
    /// GULP input (core/shell)
    Gin,
    /// CSV table of positions and properties (write only)
    Csv,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Xyz => write!(f, "xyz"),
            Format::Poscar => write!(f, "poscar"),
            Format::Cell => write!(f, "cell"),
            Format::Res => write!(f, "res"),
            Format::Gin => write!(f, "gin"),
            Format::Csv => write!(f, "csv"),
        }
    }
}

impl Format {
    /// 从文件名推断格式
    pub fn detect(path: &Path) -> Option<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xyz" | "exyz" | "extxyz" => Some(Format::Xyz),
            "vasp" | "poscar" => Some(Format::Poscar),
            "cell" => Some(Format::Cell),
            "res" => Some(Format::Res),
            "gin" | "gulp" => Some(Format::Gin),
            "csv" => Some(Format::Csv),
            _ if is_poscar_name(path) => Some(Format::Poscar),
            _ => None,
        }
    }

    /// 标准扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Xyz => "xyz",
            Format::Poscar => "vasp",
            Format::Cell => "cell",
            Format::Res => "res",
            Format::Gin => "gin",
            Format::Csv => "csv",
        }
    }

    pub fn can_read(&self) -> bool {
        !matches!(self, Format::Csv)
    }

    pub fn supports_shells(&self) -> bool {
        matches!(self, Format::Gin | Format::Csv)
    }

    pub fn supports_auxiliary(&self) -> bool {
        matches!(self, Format::Xyz | Format::Csv)
    }

    /// 由输出路径得到该格式的实际文件路径
    ///
    /// `out.xyz` + cell -> `out.cell`；`POSCAR` + poscar -> `POSCAR`；
    /// 无法识别的扩展名保留为文件名的一部分。
    pub fn output_path(&self, output: &Path) -> PathBuf {
        if *self == Format::Poscar && is_poscar_name(output) {
            return output.to_path_buf();
        }

        let base = match Format::detect(output) {
            Some(_) if output.extension().is_some() => output.with_extension(""),
            _ => output.to_path_buf(),
        };

        let mut name = base.into_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

fn is_poscar_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with("POSCAR") || name.starts_with("CONTCAR"))
        .unwrap_or(false)
}

/// 读取结构文件；`format` 为 None 时由文件名推断
pub fn read_structure_file(path: &Path, format: Option<Format>) -> Result<System> {
    let format = match format.or_else(|| Format::detect(path)) {
        Some(f) => f,
        None => {
            return Err(QmergeError::UnsupportedFormat(format!(
                "Cannot determine format for: {}",
                path.display()
            )))
        }
    };

    if !format.can_read() {
        return Err(write_only(format));
    }

    if !path.exists() {
        return Err(QmergeError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| QmergeError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    let mut system = match format {
        Format::Xyz => xyz::parse_xyz_content(&content, default_name),
        Format::Poscar => poscar::parse_poscar_content(&content, default_name),
        Format::Cell => cell::parse_cell_content(&content, default_name),
        Format::Res => res::parse_res_content(&content, default_name),
        Format::Gin => gin::parse_gin_content(&content, default_name),
        Format::Csv => Err(write_only(format)),
    }
    .map_err(|e| with_path(e, path))?;

    system.source_format = Some(format.to_string());
    Ok(system)
}

fn write_only(format: Format) -> QmergeError {
    QmergeError::UnsupportedFormat(format!("{} files can only be written", format))
}

/// 解析错误中补上真实文件路径
fn with_path(err: QmergeError, path: &Path) -> QmergeError {
    match err {
        QmergeError::ParseError { format, reason, .. } => QmergeError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    }
}

/// 生成指定格式的文本
pub fn to_format_string(system: &System, format: Format) -> Result<String> {
    match format {
        Format::Xyz => Ok(xyz::to_xyz_string(system)),
        Format::Poscar => Ok(poscar::to_poscar_string(system)),
        Format::Cell => Ok(cell::to_cell_string(system)),
        Format::Res => Ok(res::to_res_string(system)),
        Format::Gin => Ok(gin::to_gin_string(system)),
        Format::Csv => table::to_csv_string(system),
    }
}

/// 写出结构文件
pub fn write_structure_file(path: &Path, format: Format, system: &System) -> Result<()> {
    let content = to_format_string(system, format)?;

    fs::write(path, content).map_err(|e| QmergeError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
