//! # 合并后处理选项
//!
//! 合并结束后、写出之前按命令行给出的顺序依次应用：
//! - `Shift`: 平移所有粒子与壳层
//! - `Wrap`: 把粒子按分数坐标折回盒子内，壳层随核一起移动
//! - `RemoveProperty`: 删除一个辅助属性列
//! - `SelectSystems`: 只保留 `sysID` 在给定列表中的粒子
//!
//! ## 依赖关系
//! - 被 `merge/engine.rs` 调用
//! - 使用 `models/`, `merge/notify.rs`

use crate::error::{QmergeError, Result};
use crate::merge::notify::{Notice, Notifier};
use crate::models::{System, SYS_ID};

use std::fmt;

/// 单个后处理操作
#[derive(Debug, Clone, PartialEq)]
pub enum SystemOption {
    Shift([f64; 3]),
    Wrap,
    RemoveProperty(String),
    SelectSystems(Vec<usize>),
}

impl fmt::Display for SystemOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemOption::Shift(v) => write!(f, "shift by ({}, {}, {})", v[0], v[1], v[2]),
            SystemOption::Wrap => write!(f, "wrap into box"),
            SystemOption::RemoveProperty(name) => write!(f, "remove property '{}'", name),
            SystemOption::SelectSystems(ids) => {
                let ids: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
                write!(f, "select systems {}", ids.join(","))
            }
        }
    }
}

impl SystemOption {
    fn name(&self) -> &'static str {
        match self {
            SystemOption::Shift(_) => "shift",
            SystemOption::Wrap => "wrap",
            SystemOption::RemoveProperty(_) => "remove-property",
            SystemOption::SelectSystems(_) => "select-sys",
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> QmergeError {
        QmergeError::InvalidOption {
            option: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

/// 按顺序应用所有选项
pub fn apply_options(
    mut system: System,
    options: &[SystemOption],
    notifier: &mut dyn Notifier,
) -> Result<System> {
    for option in options {
        match option {
            SystemOption::Shift(v) => shift(&mut system, *v),
            SystemOption::Wrap => wrap(&mut system).map_err(|r| option.invalid(r))?,
            SystemOption::RemoveProperty(name) => {
                if !system.auxiliary.remove_column(name) {
                    notifier.notify(Notice::Warning(format!(
                        "Property '{}' not found, nothing removed",
                        name.trim()
                    )));
                    continue;
                }
            }
            SystemOption::SelectSystems(ids) => {
                select_systems(&mut system, ids).map_err(|r| option.invalid(r))?;
                if system.atoms.is_empty() {
                    notifier.notify(Notice::Warning(
                        "Selection left no particles".to_string(),
                    ));
                }
            }
        }
        notifier.notify(Notice::OptionApplied(option.to_string()));
    }

    Ok(system)
}

fn shift(system: &mut System, v: [f64; 3]) {
    for atom in system.atoms.iter_mut() {
        atom.translate(v);
    }
    if let Some(shells) = system.shells.as_mut() {
        for shell in shells.iter_mut().flatten() {
            shell.translate(v);
        }
    }
}

fn wrap(system: &mut System) -> std::result::Result<(), String> {
    let lattice = system.lattice;
    if lattice.is_degenerate() {
        return Err("the simulation box has zero volume".to_string());
    }

    for (i, atom) in system.atoms.iter_mut().enumerate() {
        let frac = lattice.to_fractional(atom.position);
        // 整数倍晶格向量的平移
        let image = [-frac[0].floor(), -frac[1].floor(), -frac[2].floor()];
        if image == [0.0; 3] {
            continue;
        }

        let delta = lattice.to_cartesian(image);
        atom.translate(delta);
        if let Some(Some(shell)) = system.shells.as_mut().and_then(|s| s.get_mut(i)) {
            shell.translate(delta);
        }
    }

    Ok(())
}

fn select_systems(system: &mut System, ids: &[usize]) -> std::result::Result<(), String> {
    let column = system
        .auxiliary
        .column(SYS_ID)
        .ok_or_else(|| format!("no '{}' column to select on", SYS_ID))?;

    let keep: Vec<bool> = column
        .iter()
        .map(|v| v.round() >= 1.0 && ids.contains(&(v.round() as usize)))
        .collect();

    let mut flags = keep.iter();
    system.atoms.retain(|_| flags.next().copied().unwrap_or(false));

    if let Some(shells) = system.shells.as_mut() {
        let mut flags = keep.iter();
        shells.retain(|_| flags.next().copied().unwrap_or(false));
    }

    system.auxiliary.retain_rows(&keep);
    Ok(())
}

/// 解析 `x,y,z` 形式的平移向量
pub fn parse_vector(s: &str) -> std::result::Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return Err(format!("expected 'x,y,z', got '{}'", s));
    }

    let mut v = [0.0; 3];
    for (slot, part) in v.iter_mut().zip(parts.iter()) {
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is not a number", part))?;
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::notify::NoticeLog;
    use crate::models::{Atom, Lattice};

    fn merged_pair() -> System {
        let mut system = System::new(
            "pair",
            Lattice::orthorhombic(10.0, 10.0, 10.0),
            vec![
                Atom::new("Na", [1.0, 1.0, 1.0]),
                Atom::new("Cl", [11.5, -0.5, 2.0]),
                Atom::new("Na", [3.0, 3.0, 3.0]),
            ],
        );
        system.shells = Some(vec![None, Some(Atom::new("Cl", [11.6, -0.5, 2.0])), None]);
        system
            .auxiliary
            .insert_column("charge", vec![1.0, -1.0, 1.0])
            .unwrap();
        system
            .auxiliary
            .insert_column(SYS_ID, vec![1.0, 2.0, 3.0])
            .unwrap();
        system
    }

    #[test]
    fn test_shift_moves_atoms_and_shells() {
        let mut log = NoticeLog::new();
        let system = apply_options(merged_pair(), &[SystemOption::Shift([1.0, 0.0, -1.0])], &mut log)
            .unwrap();

        assert_eq!(system.atoms[0].position, [2.0, 1.0, 0.0]);
        let shell = system.shells.as_ref().unwrap()[1].as_ref().unwrap();
        assert!((shell.position[0] - 12.6).abs() < 1e-12);
        assert_eq!(log.notices.len(), 1);
    }

    #[test]
    fn test_wrap_keeps_shell_with_core() {
        let mut log = NoticeLog::new();
        let system = apply_options(merged_pair(), &[SystemOption::Wrap], &mut log).unwrap();

        let core = system.atoms[1].position;
        assert!((core[0] - 1.5).abs() < 1e-9);
        assert!((core[1] - 9.5).abs() < 1e-9);
        let shell = system.shells.as_ref().unwrap()[1].as_ref().unwrap();
        assert!((shell.position[0] - 1.6).abs() < 1e-9);
        assert!((shell.position[1] - 9.5).abs() < 1e-9);
        assert_eq!(system.atoms[0].position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_wrap_without_box_fails() {
        let system = System::new("gas", Lattice::default(), vec![Atom::new("Ar", [1.0, 0.0, 0.0])]);
        let mut log = NoticeLog::new();
        let err = apply_options(system, &[SystemOption::Wrap], &mut log).unwrap_err();
        assert!(matches!(err, QmergeError::InvalidOption { .. }));
    }

    #[test]
    fn test_remove_property() {
        let mut log = NoticeLog::new();
        let system = apply_options(
            merged_pair(),
            &[SystemOption::RemoveProperty(" charge ".to_string())],
            &mut log,
        )
        .unwrap();

        assert_eq!(system.auxiliary.names(), &[SYS_ID.to_string()]);
        assert_eq!(system.auxiliary.nrows(), 3);
    }

    #[test]
    fn test_remove_missing_property_warns() {
        let mut log = NoticeLog::new();
        let system = apply_options(
            merged_pair(),
            &[SystemOption::RemoveProperty("spin".to_string())],
            &mut log,
        )
        .unwrap();

        assert_eq!(system.auxiliary.ncols(), 2);
        assert_eq!(log.warnings(), 1);
    }

    #[test]
    fn test_select_systems_filters_consistently() {
        let mut log = NoticeLog::new();
        let system = apply_options(
            merged_pair(),
            &[SystemOption::SelectSystems(vec![2, 3])],
            &mut log,
        )
        .unwrap();

        assert_eq!(system.atoms.len(), 2);
        assert_eq!(system.atoms[0].element, "Cl");
        assert_eq!(system.shells.as_ref().unwrap().len(), 2);
        assert!(system.shells.as_ref().unwrap()[0].is_some());
        assert_eq!(system.auxiliary.column(SYS_ID).unwrap(), vec![2.0, 3.0]);
        assert_eq!(system.auxiliary.column("charge").unwrap(), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_select_without_sysid_fails() {
        let mut log = NoticeLog::new();
        let options = [
            SystemOption::RemoveProperty(SYS_ID.to_string()),
            SystemOption::SelectSystems(vec![1]),
        ];
        let err = apply_options(merged_pair(), &options, &mut log).unwrap_err();
        assert!(err.to_string().contains("select-sys"));
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1, -2.5,0").unwrap(), [1.0, -2.5, 0.0]);
        assert!(parse_vector("1,2").is_err());
        assert!(parse_vector("1,a,3").is_err());
    }
}
