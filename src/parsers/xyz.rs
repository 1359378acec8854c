//! # 扩展 XYZ 格式解析器
//!
//! 解析/写出扩展 XYZ 文件（兼容普通 XYZ）。
//!
//! ## 扩展 XYZ 格式说明
//! ```text
//! 3
//! Lattice="a1 a2 a3 b1 b2 b3 c1 c2 c3" Properties=species:S:1:pos:R:3:charge:R:1 free text
//! Na  0.0 0.0 0.0  1.0
//! Cl  2.8 0.0 0.0 -1.0
//! Na  2.8 2.8 0.0  1.0
//! ```
//!
//! - `species`、`pos` 之外的单列实数/整数属性读入辅助属性表
//! - 第二行去掉 `Lattice=` / `Properties=` 后剩余的文本作为注释
//! - 没有 `Properties=` 时按 `species:S:1:pos:R:3` 处理
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/`，`regex` 解析键值对

use crate::error::{QmergeError, Result};
use crate::models::{Atom, Lattice, System};

use regex::Regex;
use std::sync::LazyLock;

static HEADER_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w\-]*)\s*=\s*(?:"([^"]*)"|(\S+))"#).unwrap()
});

/// 单个属性列描述
#[derive(Debug, Clone, PartialEq)]
struct PropertySpec {
    name: String,
    kind: char,
    ncols: usize,
}

/// 从字符串内容解析扩展 XYZ 格式
pub fn parse_xyz_content(content: &str, default_name: &str) -> Result<System> {
    let err = |reason: String| QmergeError::parse("xyz", default_name, reason);

    let mut lines = content.lines();

    let count_line = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| err("Empty file".to_string()))?;
    let n_atoms: usize = count_line
        .trim()
        .parse()
        .map_err(|_| err(format!("Invalid atom count '{}'", count_line.trim())))?;

    let header = lines.next().unwrap_or("");
    let (lattice, specs, free_text) = parse_header(header).map_err(err)?;

    check_reserved(&specs).map_err(err)?;
    let pos_offset = column_offset(&specs, "pos")
        .ok_or_else(|| err("Properties= has no 'pos:R:3' entry".to_string()))?;
    let species_offset = column_offset(&specs, "species");
    let total_cols: usize = specs.iter().map(|s| s.ncols).sum();

    let aux_specs: Vec<(usize, &PropertySpec)> = specs
        .iter()
        .scan(0usize, |offset, spec| {
            let start = *offset;
            *offset += spec.ncols;
            Some((start, spec))
        })
        .filter(|(_, s)| is_auxiliary(s))
        .collect();

    let mut atoms = Vec::with_capacity(n_atoms);
    let mut aux_columns: Vec<Vec<f64>> = vec![Vec::with_capacity(n_atoms); aux_specs.len()];

    for i in 0..n_atoms {
        let line = lines
            .next()
            .ok_or_else(|| err(format!("Expected {} atoms, found {}", n_atoms, i)))?;
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < total_cols {
            return Err(err(format!(
                "Atom line {} has {} columns, expected {}",
                i + 1,
                parts.len(),
                total_cols
            )));
        }

        let element = species_offset.map(|o| parts[o]).unwrap_or("X");

        let mut position = [0.0; 3];
        for k in 0..3 {
            position[k] = parse_number(parts[pos_offset + k]).ok_or_else(|| {
                err(format!(
                    "Invalid coordinate '{}' on atom line {}",
                    parts[pos_offset + k],
                    i + 1
                ))
            })?;
        }
        atoms.push(Atom::new(element, position));

        for (column, (offset, spec)) in aux_columns.iter_mut().zip(aux_specs.iter()) {
            let value = parse_number(parts[*offset]).ok_or_else(|| {
                err(format!(
                    "Invalid value '{}' for property '{}' on atom line {}",
                    parts[*offset],
                    spec.name,
                    i + 1
                ))
            })?;
            column.push(value);
        }
    }

    let mut system = System::new(default_name, lattice.unwrap_or_default(), atoms);
    for ((_, spec), column) in aux_specs.iter().zip(aux_columns) {
        system
            .auxiliary
            .insert_column(spec.name.clone(), column)
            .map_err(|e| err(e.to_string()))?;
    }
    if !free_text.is_empty() {
        system.comments.push(free_text);
    }

    Ok(system)
}

/// 解析第二行：(晶格, 属性列, 剩余文本)
fn parse_header(header: &str) -> std::result::Result<(Option<Lattice>, Vec<PropertySpec>, String), String> {
    let mut lattice = None;
    let mut specs = None;
    let mut free_text = header.to_string();

    for cap in HEADER_PAIR.captures_iter(header) {
        let key = cap[1].to_lowercase();
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");

        match key.as_str() {
            "lattice" => {
                let numbers: Vec<f64> = value
                    .split_whitespace()
                    .filter_map(parse_number)
                    .collect();
                if numbers.len() != 9 {
                    return Err(format!("Lattice= needs 9 numbers, found {}", numbers.len()));
                }
                lattice = Some(Lattice::from_vectors([
                    [numbers[0], numbers[1], numbers[2]],
                    [numbers[3], numbers[4], numbers[5]],
                    [numbers[6], numbers[7], numbers[8]],
                ]));
            }
            "properties" => specs = Some(parse_properties(value)?),
            _ => continue,
        }

        free_text = free_text.replacen(&cap[0], "", 1);
    }

    let specs = specs.unwrap_or_else(default_properties);
    let free_text = free_text.split_whitespace().collect::<Vec<_>>().join(" ");

    Ok((lattice, specs, free_text))
}

/// 解析 `name:T:n:name:T:n...`
fn parse_properties(value: &str) -> std::result::Result<Vec<PropertySpec>, String> {
    let fields: Vec<&str> = value.split(':').collect();
    if fields.len() % 3 != 0 {
        return Err(format!("Malformed Properties= '{}'", value));
    }

    fields
        .chunks(3)
        .map(|chunk| {
            let kind = chunk[1]
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .ok_or_else(|| format!("Missing type for property '{}'", chunk[0]))?;
            let ncols = chunk[2]
                .parse::<usize>()
                .map_err(|_| format!("Invalid column count for property '{}'", chunk[0]))?;
            Ok(PropertySpec {
                name: chunk[0].to_string(),
                kind,
                ncols,
            })
        })
        .collect()
}

fn default_properties() -> Vec<PropertySpec> {
    vec![
        PropertySpec {
            name: "species".to_string(),
            kind: 'S',
            ncols: 1,
        },
        PropertySpec {
            name: "pos".to_string(),
            kind: 'R',
            ncols: 3,
        },
    ]
}

/// species 必须为 S:1，pos 必须为 R:3
fn check_reserved(specs: &[PropertySpec]) -> std::result::Result<(), String> {
    for spec in specs {
        let expected = if spec.name.eq_ignore_ascii_case("species") {
            ('S', 1)
        } else if spec.name.eq_ignore_ascii_case("pos") {
            ('R', 3)
        } else {
            continue;
        };
        if (spec.kind, spec.ncols) != expected {
            return Err(format!(
                "Property '{}' must be {}:{}, found {}:{}",
                spec.name, expected.0, expected.1, spec.kind, spec.ncols
            ));
        }
    }
    Ok(())
}

fn column_offset(specs: &[PropertySpec], name: &str) -> Option<usize> {
    let mut offset = 0;
    for spec in specs {
        if spec.name.eq_ignore_ascii_case(name) {
            return Some(offset);
        }
        offset += spec.ncols;
    }
    None
}

fn is_auxiliary(spec: &PropertySpec) -> bool {
    let reserved = spec.name.eq_ignore_ascii_case("species") || spec.name.eq_ignore_ascii_case("pos");
    !reserved && spec.ncols == 1 && matches!(spec.kind, 'R' | 'I')
}

/// 兼容 Fortran 风格指数 (1.0D-3)
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace(['D', 'd'], "E").parse().ok())
}

/// 属性名中不能出现空白与冒号
fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '_' } else { c })
        .collect()
}

/// 整数值按整数写出，其余保留 8 位小数
pub(crate) fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.8}", v)
    }
}

/// 将 System 转换为扩展 XYZ 格式字符串
pub fn to_xyz_string(system: &System) -> String {
    let mut result = String::new();
    result.push_str(&format!("{}\n", system.atoms.len()));

    let mut header = Vec::new();
    if !system.lattice.is_degenerate() {
        let m = system.lattice.matrix;
        let numbers: Vec<String> = m.iter().flatten().map(|v| format!("{:.10}", v)).collect();
        header.push(format!("Lattice=\"{}\"", numbers.join(" ")));
    }

    let mut properties = String::from("species:S:1:pos:R:3");
    for name in system.auxiliary.names() {
        properties.push_str(&format!(":{}:R:1", sanitize_name(name)));
    }
    header.push(format!("Properties={}", properties));

    if !system.comments.is_empty() {
        header.push(system.comments.join(" "));
    }
    result.push_str(&header.join(" "));
    result.push('\n');

    for (i, atom) in system.atoms.iter().enumerate() {
        result.push_str(&format!(
            "{:4} {:16.10} {:16.10} {:16.10}",
            atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
        for v in system.auxiliary.row(i) {
            result.push_str(&format!(" {:>14}", format_value(*v)));
        }
        result.push('\n');
    }

    result
}
