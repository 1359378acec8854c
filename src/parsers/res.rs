//! # AIRSS .res 格式解析器
//!
//! 解析/写出 AIRSS 结构搜索产生的 .res 文件格式。
//!
//! ## .res 格式说明
//! ```text
//! TITL name P V E H 0 0 n (sym)
//! REM free text
//! CELL 1.0 a b c alpha beta gamma
//! LATT -1
//! SFAC Element1 Element2 ...
//! Element1 1 x1 y1 z1 1.0
//! Element2 2 x2 y2 z2 1.0
//! ...
//! END
//! ```
//!
//! `REM` 行作为注释保留；原子坐标为分数坐标。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QmergeError, Result};
use crate::models::{Atom, Lattice, System};

/// 从字符串内容解析 .res 格式
pub fn parse_res_content(content: &str, default_name: &str) -> Result<System> {
    let mut name = default_name.to_string();
    let mut lattice: Option<Lattice> = None;
    let mut fractional: Vec<(String, [f64; 3])> = Vec::new();
    let mut sfac_elements: Vec<String> = Vec::new();
    let mut comments: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_uppercase().as_str() {
            "TITL" => {
                if parts.len() >= 2 {
                    name = parts[1].to_string();
                }
            }
            "REM" => {
                let text = line[3..].trim();
                if !text.is_empty() {
                    comments.push(text.to_string());
                }
            }
            "CELL" => {
                // CELL wavelength a b c alpha beta gamma
                let params: Vec<f64> = parts
                    .iter()
                    .skip(2)
                    .take(6)
                    .filter_map(|s| s.parse().ok())
                    .collect();
                if params.len() < 6 {
                    return Err(QmergeError::parse("res", &name, "Incomplete CELL line"));
                }
                lattice = Some(Lattice::from_parameters(
                    params[0], params[1], params[2], params[3], params[4], params[5],
                ));
            }
            "SFAC" => {
                sfac_elements = parts[1..].iter().map(|s| s.to_string()).collect();
            }
            "LATT" | "ZERR" | "END" => {}
            _ => {
                // 原子行: Element type x y z occ
                if parts.len() >= 5
                    && sfac_elements
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(parts[0]))
                {
                    if let (Ok(x), Ok(y), Ok(z)) = (
                        parts[2].parse::<f64>(),
                        parts[3].parse::<f64>(),
                        parts[4].parse::<f64>(),
                    ) {
                        fractional.push((parts[0].to_string(), [x, y, z]));
                    }
                }
            }
        }
    }

    let lattice =
        lattice.ok_or_else(|| QmergeError::parse("res", &name, "Missing CELL line"))?;

    let atoms = fractional
        .into_iter()
        .map(|(el, f)| Atom::new(el, lattice.to_cartesian(f)))
        .collect();

    let mut system = System::new(name, lattice, atoms);
    system.comments = comments;

    Ok(system)
}

/// 将 System 转换为 .res 格式字符串
pub fn to_res_string(system: &System) -> String {
    let (a, b, c, alpha, beta, gamma) = system.lattice.parameters();
    let elements = system.species();
    let volume = system.lattice.volume().abs();
    let title = if system.name.trim().is_empty() {
        "structure".to_string()
    } else {
        system.name.split_whitespace().collect::<Vec<_>>().join("_")
    };

    let mut result = format!(
        "TITL {} 0.0 {:.6} 0.0 0.0 0 0 {} (P1)\n",
        title,
        volume,
        system.atoms.len()
    );

    for comment in &system.comments {
        result.push_str(&format!("REM {}\n", comment));
    }

    result.push_str(&format!(
        "CELL 1.54180 {:.10} {:.10} {:.10} {:.6} {:.6} {:.6}\n",
        a, b, c, alpha, beta, gamma
    ));
    result.push_str("LATT -1\n");
    result.push_str(&format!("SFAC {}\n", elements.join(" ")));

    // 分数坐标与晶格取向无关
    for atom in &system.atoms {
        let element_idx = elements
            .iter()
            .position(|e| *e == atom.element)
            .unwrap_or(0)
            + 1;
        let f = system.lattice.to_fractional(atom.position);
        result.push_str(&format!(
            "{} {} {:.10} {:.10} {:.10} 1.0\n",
            atom.element, element_idx, f[0], f[1], f[2]
        ));
    }

    result.push_str("END\n");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_res_basic() {
        let content = r#"
TITL TiC-12345 100.0 50.0 -100.0 -99.5 0 0 2 (Fm-3m)
REM generated by airss
CELL 1.0 4.33 4.33 4.33 90.0 90.0 90.0
LATT -1
SFAC Ti C
Ti 1 0.0 0.0 0.0 1.0
C 2 0.5 0.5 0.5 1.0
END
"#;
        let system = parse_res_content(content, "test").unwrap();
        assert_eq!(system.name, "TiC-12345");
        assert_eq!(system.atoms.len(), 2);
        assert_eq!(system.comments, vec!["generated by airss".to_string()]);

        let p = system.atoms[1].position;
        assert!((p[0] - 2.165).abs() < 1e-6);
        assert!((p[2] - 2.165).abs() < 1e-6);
    }

    #[test]
    fn test_parse_res_missing_cell() {
        let content = "TITL x\nSFAC Fe\nFe 1 0 0 0 1.0\nEND\n";
        assert!(parse_res_content(content, "x").is_err());
    }

    #[test]
    fn test_res_writer_output_parses() {
        let mut system = System::new(
            "Fe bcc",
            Lattice::orthorhombic(2.87, 2.87, 2.87),
            vec![
                Atom::new("Fe", [0.0, 0.0, 0.0]),
                Atom::new("Fe", [1.435, 1.435, 1.435]),
            ],
        );
        system.comments = vec!["note".to_string()];

        let text = to_res_string(&system);
        assert!(text.starts_with("TITL Fe_bcc"));

        let parsed = parse_res_content(&text, "back").unwrap();
        assert_eq!(parsed.atoms.len(), 2);
        assert!((parsed.atoms[1].position[1] - 1.435).abs() < 1e-6);
        assert_eq!(parsed.comments, vec!["note".to_string()]);
    }
}
