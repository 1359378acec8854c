//! # CSV 表格导出
//!
//! 把体系写成每个粒子一行的 CSV 表：序号、元素、坐标、可选的壳层坐标，
//! 以及全部辅助属性列。只写不读。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 调用
//! - 使用 `csv` 库

use crate::error::{QmergeError, Result};
use crate::models::System;
use crate::parsers::xyz::format_value;

/// 将 System 转换为 CSV 字符串
pub fn to_csv_string(system: &System) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let has_shells = system.shells.is_some();

    let mut header: Vec<String> = ["index", "species", "x", "y", "z"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if has_shells {
        header.extend(["shell_x", "shell_y", "shell_z"].iter().map(|s| s.to_string()));
    }
    header.extend(system.auxiliary.names().iter().map(|n| n.trim().to_string()));
    wtr.write_record(&header)?;

    for (i, atom) in system.atoms.iter().enumerate() {
        let mut record = vec![
            (i + 1).to_string(),
            atom.element.clone(),
            format!("{:.10}", atom.position[0]),
            format!("{:.10}", atom.position[1]),
            format!("{:.10}", atom.position[2]),
        ];

        if has_shells {
            let shell = system
                .shells
                .as_ref()
                .and_then(|s| s.get(i))
                .and_then(|s| s.as_ref());
            match shell {
                Some(s) => record.extend(s.position.iter().map(|v| format!("{:.10}", v))),
                None => record.extend(std::iter::repeat(String::new()).take(3)),
            }
        }

        record.extend(system.auxiliary.row(i).iter().map(|v| format_value(*v)));
        wtr.write_record(&record)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| QmergeError::Other(format!("CSV buffer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| QmergeError::Other(e.to_string()))
}
