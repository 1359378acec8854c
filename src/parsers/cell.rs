//! # CASTEP .cell 格式解析器
//!
//! 解析/写出 CASTEP 输入文件 .cell 格式。
//!
//! ## .cell 格式说明
//! ```text
//! # comment
//! %BLOCK LATTICE_CART
//! ang
//! a1 a2 a3
//! b1 b2 b3
//! c1 c2 c3
//! %ENDBLOCK LATTICE_CART
//!
//! %BLOCK POSITIONS_FRAC
//! Element x y z
//! ...
//! %ENDBLOCK POSITIONS_FRAC
//! ```
//!
//! 块外以 `#` 或 `!` 开头的行作为注释保留。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QmergeError, Result};
use crate::models::{Atom, Lattice, System};

/// 从字符串内容解析 .cell 格式
pub fn parse_cell_content(content: &str, default_name: &str) -> Result<System> {
    let lines: Vec<&str> = content.lines().collect();

    let mut lattice: Option<Lattice> = None;
    let mut raw_atoms: Vec<Atom> = Vec::new();
    let mut fractional = true;

    if let Some(start) = find_block_start(&lines, "LATTICE_CART") {
        lattice = Some(parse_lattice_cart(&lines, start, default_name)?);
    } else if let Some(start) = find_block_start(&lines, "LATTICE_ABC") {
        lattice = Some(parse_lattice_abc(&lines, start, default_name)?);
    }

    if let Some(start) = find_block_start(&lines, "POSITIONS_FRAC") {
        raw_atoms = parse_positions(&lines, start);
    } else if let Some(start) = find_block_start(&lines, "POSITIONS_ABS") {
        raw_atoms = parse_positions(&lines, start);
        fractional = false;
    }

    let lattice = lattice.ok_or_else(|| {
        QmergeError::parse(
            "cell",
            default_name,
            "Missing LATTICE_CART or LATTICE_ABC block",
        )
    })?;

    let atoms = if fractional {
        raw_atoms
            .into_iter()
            .map(|a| Atom::new(a.element, lattice.to_cartesian(a.position)))
            .collect()
    } else {
        raw_atoms
    };

    let mut system = System::new(default_name, lattice, atoms);
    system.comments = collect_comments(&lines);

    Ok(system)
}

/// 查找 %BLOCK XXX 的起始行号
fn find_block_start(lines: &[&str], block_name: &str) -> Option<usize> {
    lines.iter().position(|line| {
        let upper = line.trim().to_uppercase();
        let mut parts = upper.split_whitespace();
        parts.next() == Some("%BLOCK") && parts.next() == Some(block_name)
    })
}

/// 块内有效数据行（跳过注释、空行、单位行）
fn block_lines<'a>(lines: &[&'a str], start: usize) -> Vec<&'a str> {
    let mut out = Vec::new();
    for line in lines.iter().skip(start + 1) {
        let line = line.trim();
        if line.to_uppercase().starts_with("%ENDBLOCK") {
            break;
        }
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        // 单位行（如 "ang" 或 "bohr"）
        if line.eq_ignore_ascii_case("ang")
            || line.eq_ignore_ascii_case("bohr")
            || line.eq_ignore_ascii_case("nm")
        {
            continue;
        }
        out.push(line);
    }
    out
}

/// 块外注释行
fn collect_comments(lines: &[&str]) -> Vec<String> {
    let mut comments = Vec::new();
    let mut in_block = false;

    for line in lines {
        let trimmed = line.trim();
        let upper = trimmed.to_uppercase();
        if upper.starts_with("%BLOCK") {
            in_block = true;
            continue;
        }
        if upper.starts_with("%ENDBLOCK") {
            in_block = false;
            continue;
        }
        if !in_block && (trimmed.starts_with('#') || trimmed.starts_with('!')) {
            let text = trimmed.trim_start_matches(['#', '!']).trim();
            if !text.is_empty() {
                comments.push(text.to_string());
            }
        }
    }

    comments
}

/// 解析 LATTICE_CART 块
fn parse_lattice_cart(lines: &[&str], start: usize, name: &str) -> Result<Lattice> {
    let mut matrix = [[0.0; 3]; 3];
    let mut row_idx = 0;

    for line in block_lines(lines, start) {
        let parts: Vec<f64> = line
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();

        if parts.len() >= 3 && row_idx < 3 {
            matrix[row_idx] = [parts[0], parts[1], parts[2]];
            row_idx += 1;
        }
    }

    if row_idx < 3 {
        return Err(QmergeError::parse(
            "cell",
            name,
            "Incomplete LATTICE_CART block",
        ));
    }

    Ok(Lattice::from_vectors(matrix))
}

/// 解析 LATTICE_ABC 块
fn parse_lattice_abc(lines: &[&str], start: usize, name: &str) -> Result<Lattice> {
    let params: Vec<f64> = block_lines(lines, start)
        .iter()
        .flat_map(|line| line.split_whitespace())
        .filter_map(|s| s.parse().ok())
        .collect();

    if params.len() < 6 {
        return Err(QmergeError::parse(
            "cell",
            name,
            "Incomplete LATTICE_ABC block (need a b c alpha beta gamma)",
        ));
    }

    Ok(Lattice::from_parameters(
        params[0], params[1], params[2], params[3], params[4], params[5],
    ))
}

/// 解析原子位置块（坐标原样返回）
fn parse_positions(lines: &[&str], start: usize) -> Vec<Atom> {
    let mut atoms = Vec::new();

    for line in block_lines(lines, start) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 4 {
            if let (Ok(x), Ok(y), Ok(z)) = (
                parts[1].parse::<f64>(),
                parts[2].parse::<f64>(),
                parts[3].parse::<f64>(),
            ) {
                atoms.push(Atom::new(parts[0], [x, y, z]));
            }
        }
    }

    atoms
}

/// 将 System 转换为 .cell 格式字符串
pub fn to_cell_string(system: &System) -> String {
    let mut result = String::new();

    for comment in &system.comments {
        result.push_str(&format!("# {}\n", comment));
    }
    if !system.comments.is_empty() {
        result.push('\n');
    }

    result.push_str("%BLOCK LATTICE_CART\nang\n");
    for row in &system.lattice.matrix {
        result.push_str(&format!(
            "{:16.10} {:16.10} {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }
    result.push_str("%ENDBLOCK LATTICE_CART\n\n");

    // 退化盒子写绝对坐标
    if system.lattice.is_degenerate() {
        result.push_str("%BLOCK POSITIONS_ABS\n");
        for atom in &system.atoms {
            let p = atom.position;
            result.push_str(&format!(
                "{:4} {:16.10} {:16.10} {:16.10}\n",
                atom.element, p[0], p[1], p[2]
            ));
        }
        result.push_str("%ENDBLOCK POSITIONS_ABS\n");
    } else {
        result.push_str("%BLOCK POSITIONS_FRAC\n");
        for atom in &system.atoms {
            let f = system.lattice.to_fractional(atom.position);
            result.push_str(&format!(
                "{:4} {:16.10} {:16.10} {:16.10}\n",
                atom.element, f[0], f[1], f[2]
            ));
        }
        result.push_str("%ENDBLOCK POSITIONS_FRAC\n");
    }

    result
}
