//! # VASP POSCAR 格式解析器
//!
//! 解析/写出 VASP POSCAR/CONTCAR 文件格式。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor (negative = target volume)
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QmergeError, Result};
use crate::models::{Atom, Lattice, System};

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<System> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 8 {
        return Err(QmergeError::parse("poscar", default_name, "File too short"));
    }

    // Line 0: Comment/name
    let comment = lines[0].trim().to_string();
    let name = if comment.is_empty() {
        default_name.to_string()
    } else {
        comment.clone()
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| QmergeError::parse("poscar", &name, "Invalid scaling factor"))?;

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(QmergeError::parse(
                "poscar",
                &name,
                format!("Invalid lattice vector at line {}", 3 + i),
            ));
        }
        *row = [parts[0], parts[1], parts[2]];
    }

    // 负的缩放因子表示目标体积
    let factor = if scale < 0.0 {
        let volume = Lattice::from_vectors(matrix).volume().abs();
        if volume < 1e-10 {
            return Err(QmergeError::parse("poscar", &name, "Degenerate lattice"));
        }
        (-scale / volume).cbrt()
    } else {
        scale
    };
    for row in matrix.iter_mut() {
        for v in row.iter_mut() {
            *v *= factor;
        }
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5_parts: Vec<&str> = lines[5].split_whitespace().collect();
    if line5_parts.is_empty() {
        return Err(QmergeError::parse("poscar", &name, "Missing species line"));
    }
    let (elements, counts, atom_line_start) = if line5_parts[0].parse::<usize>().is_ok() {
        // VASP 4: 只有数目，元素名用占位符
        let counts: Vec<usize> = line5_parts.iter().filter_map(|s| s.parse().ok()).collect();
        let elements: Vec<String> = (0..counts.len()).map(|i| format!("X{}", i + 1)).collect();
        (elements, counts, 6)
    } else {
        let elements: Vec<String> = line5_parts.iter().map(|s| s.to_string()).collect();
        let counts: Vec<usize> = lines[6]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        (elements, counts, 7)
    };

    if counts.len() != elements.len() {
        return Err(QmergeError::parse(
            "poscar",
            &name,
            "Species and count lines do not match",
        ));
    }

    // Check for "Selective dynamics" line
    let mut coord_line = atom_line_start;
    if lines.len() > coord_line
        && lines[coord_line]
            .trim()
            .to_lowercase()
            .starts_with('s')
    {
        coord_line += 1;
    }

    if lines.len() <= coord_line {
        return Err(QmergeError::parse(
            "poscar",
            &name,
            "Missing coordinate type line",
        ));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    // Parse atom positions
    let total: usize = counts.iter().sum();
    let mut atoms: Vec<Atom> = Vec::with_capacity(total);
    let mut line_idx = coord_line + 1;

    for (elem, &count) in elements.iter().zip(counts.iter()) {
        for _ in 0..count {
            let parts: Vec<f64> = lines
                .get(line_idx)
                .map(|l| {
                    l.split_whitespace()
                        .take(3)
                        .filter_map(|s| s.parse().ok())
                        .collect()
                })
                .unwrap_or_default();

            if parts.len() < 3 {
                return Err(QmergeError::parse(
                    "poscar",
                    &name,
                    format!("Invalid or missing position at line {}", line_idx + 1),
                ));
            }

            let raw = [parts[0], parts[1], parts[2]];
            let position = if is_cartesian {
                [raw[0] * factor, raw[1] * factor, raw[2] * factor]
            } else {
                lattice.to_cartesian(raw)
            };
            atoms.push(Atom::new(elem.clone(), position));
            line_idx += 1;
        }
    }

    let mut system = System::new(name, lattice, atoms);
    if !comment.is_empty() {
        system.comments.push(comment);
    }

    Ok(system)
}

/// 将 System 转换为 POSCAR 格式字符串
///
/// 保持原子顺序：相邻的同种元素合并为一组，同一元素可以出现多组。
pub fn to_poscar_string(system: &System) -> String {
    // 连续同元素分组
    let mut groups: Vec<(String, usize)> = Vec::new();
    for atom in &system.atoms {
        match groups.last_mut() {
            Some((elem, count)) if *elem == atom.element => *count += 1,
            _ => groups.push((atom.element.clone(), 1)),
        }
    }

    let mut result = String::new();

    // Line 0: Comment
    let title = system
        .comments
        .first()
        .cloned()
        .unwrap_or_else(|| system.name.clone());
    result.push_str(&format!("{}\n", title.replace('\n', " ")));

    // Line 1: Scale
    result.push_str("1.0\n");

    // Lines 2-4: Lattice
    for row in &system.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    let elements: Vec<&str> = groups.iter().map(|(e, _)| e.as_str()).collect();
    let counts: Vec<String> = groups.iter().map(|(_, n)| n.to_string()).collect();
    result.push_str(&format!("   {}\n", elements.join("   ")));
    result.push_str(&format!("   {}\n", counts.join("   ")));

    // 退化盒子无法使用分数坐标
    if system.lattice.is_degenerate() {
        result.push_str("Cartesian\n");
        for atom in &system.atoms {
            let p = atom.position;
            result.push_str(&format!("  {:16.10}  {:16.10}  {:16.10}\n", p[0], p[1], p[2]));
        }
    } else {
        result.push_str("Direct\n");
        for atom in &system.atoms {
            let f = system.lattice.to_fractional(atom.position);
            result.push_str(&format!("  {:16.10}  {:16.10}  {:16.10}\n", f[0], f[1], f[2]));
        }
    }

    result
}
