//! # GULP 输入文件解析器
//!
//! 解析/写出 GULP 输入文件 (.gin) 中的结构部分，支持核-壳模型。
//!
//! ## .gin 格式说明
//! ```text
//! # comment
//! opti conp            # keyword line
//! title
//! MgO slab
//! end
//! vectors              # 或 cell: a b c alpha beta gamma
//! 4.2 0.0 0.0
//! 0.0 4.2 0.0
//! 0.0 0.0 4.2
//! cartesian            # 或 fractional
//! Mg core 0.0 0.0 0.0
//! O  core 2.1 0.0 0.0
//! O  shel 2.1 0.0 0.0
//! ```
//!
//! - `core` 行（或不带类型的原子行）产生粒子
//! - `shel` 行按出现顺序配对到同元素中第一个尚无壳层的核
//! - 其余关键字（势函数、species 等）忽略
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QmergeError, Result};
use crate::models::{Atom, Lattice, System};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Core,
    Shell,
}

/// 从字符串内容解析 GULP 输入
pub fn parse_gin_content(content: &str, default_name: &str) -> Result<System> {
    let err = |reason: String| QmergeError::parse("gin", default_name, reason);

    let lines: Vec<&str> = content.lines().collect();
    let mut name = default_name.to_string();
    let mut comments: Vec<String> = Vec::new();
    let mut lattice: Option<Lattice> = None;
    let mut fractional = false;
    let mut cores: Vec<Atom> = Vec::new();
    let mut shells_raw: Vec<Atom> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if let Some(text) = line.strip_prefix('#') {
            let text = text.trim();
            if !text.is_empty() {
                comments.push(text.to_string());
            }
            continue;
        }

        let line = strip_inline_comment(line);
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let keyword = parts[0].to_lowercase();
        match keyword.as_str() {
            "title" => {
                let mut first = true;
                while i < lines.len() {
                    let text = lines[i].trim();
                    i += 1;
                    if text.eq_ignore_ascii_case("end") {
                        break;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    if first {
                        name = text.to_string();
                        first = false;
                    } else {
                        comments.push(text.to_string());
                    }
                }
            }
            "vectors" | "vector" | "vect" => {
                let mut matrix = [[0.0; 3]; 3];
                let mut row = 0;
                while row < 3 && i < lines.len() {
                    let numbers = numbers_in(strip_inline_comment(lines[i].trim()));
                    i += 1;
                    if numbers.is_empty() {
                        continue;
                    }
                    if numbers.len() < 3 {
                        return Err(err(format!("Invalid lattice vector at line {}", i)));
                    }
                    matrix[row] = [numbers[0], numbers[1], numbers[2]];
                    row += 1;
                }
                if row < 3 {
                    return Err(err("Incomplete vectors block".to_string()));
                }
                lattice = Some(Lattice::from_vectors(matrix));
            }
            "cell" => {
                let mut params = numbers_in(&parts[1..].join(" "));
                while params.is_empty() && i < lines.len() {
                    params = numbers_in(strip_inline_comment(lines[i].trim()));
                    i += 1;
                }
                if params.len() < 6 {
                    return Err(err("Cell needs a b c alpha beta gamma".to_string()));
                }
                lattice = Some(Lattice::from_parameters(
                    params[0], params[1], params[2], params[3], params[4], params[5],
                ));
            }
            "cartesian" | "cart" | "fractional" | "frac" => {
                fractional = keyword.starts_with("frac");
                while i < lines.len() {
                    let text = strip_inline_comment(lines[i].trim());
                    if text.is_empty() {
                        i += 1;
                        continue;
                    }
                    match parse_atom_line(text) {
                        Some((Kind::Core, atom)) => cores.push(atom),
                        Some((Kind::Shell, atom)) => shells_raw.push(atom),
                        None => break,
                    }
                    i += 1;
                }
            }
            // 关键字行与其余选项（势函数、species 等）
            _ => {}
        }
    }

    if fractional {
        let lat = lattice
            .ok_or_else(|| err("Fractional coordinates without cell or vectors".to_string()))?;
        for atom in cores.iter_mut().chain(shells_raw.iter_mut()) {
            atom.position = lat.to_cartesian(atom.position);
        }
    }

    let shells = pair_shells(&cores, shells_raw).map_err(err)?;

    let mut system = System::new(name, lattice.unwrap_or_default(), cores);
    system.shells = shells;
    system.comments = comments;

    Ok(system)
}

/// 壳层配对到同元素第一个尚无壳层的核
fn pair_shells(
    cores: &[Atom],
    shells: Vec<Atom>,
) -> std::result::Result<Option<Vec<Option<Atom>>>, String> {
    if shells.is_empty() {
        return Ok(None);
    }

    let mut paired: Vec<Option<Atom>> = vec![None; cores.len()];
    for shell in shells {
        let slot = cores
            .iter()
            .zip(paired.iter())
            .position(|(core, s)| s.is_none() && core.element.eq_ignore_ascii_case(&shell.element))
            .ok_or_else(|| format!("Shell of {} has no matching core", shell.element))?;
        paired[slot] = Some(shell);
    }

    Ok(Some(paired))
}

/// 解析原子行：`Label [core|shel] x y z ...`
fn parse_atom_line(line: &str) -> Option<(Kind, Atom)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 || !parts[0].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let (kind, start) = match parts[1].to_lowercase().as_str() {
        "core" | "cor" | "c" | "bcor" => (Kind::Core, 2),
        "shel" | "shell" | "she" | "s" | "bshe" => (Kind::Shell, 2),
        _ => (Kind::Core, 1),
    };

    if parts.len() < start + 3 {
        return None;
    }

    let mut position = [0.0; 3];
    for k in 0..3 {
        position[k] = parse_coordinate(parts[start + k])?;
    }

    Some((kind, Atom::new(parts[0], position)))
}

/// 支持分数写法 "1/3"
fn parse_coordinate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    s.parse().ok()
}

fn numbers_in(line: &str) -> Vec<f64> {
    line.split_whitespace()
        .map_while(|s| s.parse::<f64>().ok())
        .collect()
}

fn strip_inline_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}

/// 将 System 转换为 GULP 输入字符串
pub fn to_gin_string(system: &System) -> String {
    let mut result = String::new();

    for comment in &system.comments {
        result.push_str(&format!("# {}\n", comment));
    }

    result.push_str("single\n");

    if !system.name.trim().is_empty() {
        result.push_str(&format!("title\n{}\nend\n", system.name.trim()));
    }

    if !system.lattice.is_degenerate() {
        result.push_str("vectors\n");
        for row in &system.lattice.matrix {
            result.push_str(&format!(
                "  {:16.10}  {:16.10}  {:16.10}\n",
                row[0], row[1], row[2]
            ));
        }
    }

    result.push_str("cartesian\n");
    for (i, atom) in system.atoms.iter().enumerate() {
        let p = atom.position;
        result.push_str(&format!(
            "{:4} core {:16.10} {:16.10} {:16.10}\n",
            atom.element, p[0], p[1], p[2]
        ));

        let shell = system
            .shells
            .as_ref()
            .and_then(|s| s.get(i))
            .and_then(|s| s.as_ref());
        if let Some(shell) = shell {
            let p = shell.position;
            result.push_str(&format!(
                "{:4} shel {:16.10} {:16.10} {:16.10}\n",
                shell.element, p[0], p[1], p[2]
            ));
        }
    }

    result
}
