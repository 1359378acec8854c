//! # 合并折叠步骤
//!
//! `Merger` 持有逐步累积的合并体系，每次 `fold` 并入一个输入体系：
//!
//! 1. 第一个体系：直接采用其盒子、粒子、壳层与注释，辅助属性表末尾追加 `sysID` 列
//! 2. 之后的体系：
//!    - 拼接模式下按当前盒子向量平移新粒子（及壳层），并累加盒子向量
//!    - 追加粒子；任一方有壳层时壳层序列保持与粒子逐一对齐，缺失处为 `None`
//!    - 追加注释
//!    - 统一辅助属性表：新行补零、写入 `sysID`，同名列只填新行，新列对旧行补零
//!
//! 每一步之后：粒子数 = 壳层数（若有）= 辅助属性表行数。
//!
//! ## 依赖关系
//! - 被 `merge/engine.rs` 调用
//! - 使用 `models/`, `merge/mode.rs`, `merge/notify.rs`

use super::mode::MergeMode;
use super::notify::{Notice, Notifier};
use crate::models::{System, SYS_ID};

/// 合并累积器
pub struct Merger {
    mode: MergeMode,
    merged: System,
    count: usize,
}

impl Merger {
    pub fn new(mode: MergeMode) -> Self {
        Merger {
            mode,
            merged: System::empty(),
            count: 0,
        }
    }

    /// 已并入的体系数
    pub fn systems(&self) -> usize {
        self.count
    }

    /// 当前合并结果
    #[cfg(test)]
    pub fn merged(&self) -> &System {
        &self.merged
    }

    /// 取出合并结果
    pub fn finish(self) -> System {
        self.merged
    }

    /// 并入下一个体系
    pub fn fold(&mut self, system: System, notifier: &mut dyn Notifier) {
        let index = self.count + 1;

        if self.count == 0 {
            self.adopt(system);
        } else {
            self.append(system, index, notifier);
        }

        self.count = index;
        notifier.notify(Notice::Merged {
            index,
            total: self.merged.atoms.len(),
        });
    }

    /// 第一个体系：原样采用，追加 sysID = 1
    fn adopt(&mut self, mut system: System) {
        let rows = system.atoms.len();
        // 辅助表行数与粒子数不一致时以粒子数为准
        if system.auxiliary.nrows() < rows {
            system.auxiliary.grow_rows(rows - system.auxiliary.nrows());
        }

        let (col, _) = system.auxiliary.ensure_column(SYS_ID);
        for r in 0..rows {
            system.auxiliary.set(r, col, 1.0);
        }

        if let Some(shells) = system.shells.as_mut() {
            shells.resize(rows, None);
        }

        self.merged = system;
    }

    fn append(&mut self, system: System, index: usize, notifier: &mut dyn Notifier) {
        let System {
            lattice,
            mut atoms,
            mut shells,
            auxiliary,
            comments,
            ..
        } = system;

        // 盒子与坐标
        if let Some(axis) = self.mode.axis() {
            let shift = self.merged.lattice.row(axis);
            for atom in atoms.iter_mut() {
                atom.translate(shift);
            }
            if let Some(shells) = shells.as_mut() {
                for shell in shells.iter_mut().flatten() {
                    shell.translate(shift);
                }
            }
            self.merged.lattice.extend_row(axis, lattice.row(axis));
        }

        let old_rows = self.merged.atoms.len();
        let incoming = atoms.len();

        // 壳层：保持与粒子逐一对齐
        self.merged.shells = match (self.merged.shells.take(), shells) {
            (None, None) => None,
            (acc, inc) => {
                let mut acc = acc.unwrap_or_else(|| vec![None; old_rows]);
                let mut inc = inc.unwrap_or_default();
                inc.resize(incoming, None);
                acc.extend(inc);
                Some(acc)
            }
        };

        self.merged.atoms.extend(atoms);
        self.merged.comments.extend(comments);

        // 辅助属性表
        let table = &mut self.merged.auxiliary;
        table.grow_rows(incoming);

        let (sys_col, _) = table.ensure_column(SYS_ID);
        for r in old_rows..old_rows + incoming {
            table.set(r, sys_col, index as f64);
        }

        let rows = incoming.min(auxiliary.nrows());
        for (src_col, name) in auxiliary.names().iter().enumerate() {
            if name.trim() == SYS_ID {
                continue;
            }

            let (dst_col, created) = table.ensure_column(name);
            if created {
                notifier.notify(Notice::PropertyNew(name.trim().to_string()));
            } else {
                notifier.notify(Notice::PropertyExisting(name.trim().to_string()));
            }

            for r in 0..rows {
                table.set(old_rows + r, dst_col, auxiliary.get(r, src_col));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::notify::NoticeLog;
    use crate::models::{Atom, Lattice};

    fn cubic(a: f64, b: f64, c: f64, n: usize) -> System {
        let atoms = (0..n)
            .map(|i| Atom::new("Si", [i as f64, 1.0, 2.0]))
            .collect();
        System::new("test", Lattice::orthorhombic(a, b, c), atoms)
    }

    fn with_property(mut system: System, name: &str, values: Vec<f64>) -> System {
        system.auxiliary.insert_column(name, values).unwrap();
        system
    }

    fn fold_all(mode: MergeMode, systems: Vec<System>) -> (System, NoticeLog) {
        let mut log = NoticeLog::new();
        let mut merger = Merger::new(mode);
        for s in systems {
            merger.fold(s, &mut log);
        }
        (merger.finish(), log)
    }

    #[test]
    fn test_scenario_charge_and_plain_along_x() {
        let a = with_property(cubic(10.0, 10.0, 10.0, 3), "charge", vec![1.0, -2.0, 0.5]);
        let b = cubic(5.0, 10.0, 10.0, 2);
        let b_positions: Vec<[f64; 3]> = b.atoms.iter().map(|a| a.position).collect();

        let (merged, _) = fold_all(MergeMode::Concatenate(0), vec![a, b]);

        assert_eq!(merged.atoms.len(), 5);
        assert_eq!(merged.lattice.row(0), [15.0, 0.0, 0.0]);
        assert_eq!(merged.lattice.row(1), [0.0, 10.0, 0.0]);

        for (k, original) in b_positions.iter().enumerate() {
            let p = merged.atoms[3 + k].position;
            assert!((p[0] - (original[0] + 10.0)).abs() < 1e-12);
            assert_eq!(p[1], original[1]);
            assert_eq!(p[2], original[2]);
        }

        let names = merged.auxiliary.names();
        assert_eq!(names, &["charge".to_string(), SYS_ID.to_string()]);
        assert_eq!(
            merged.auxiliary.column(SYS_ID).unwrap(),
            vec![1.0, 1.0, 1.0, 2.0, 2.0]
        );
        assert_eq!(
            merged.auxiliary.column("charge").unwrap(),
            vec![1.0, -2.0, 0.5, 0.0, 0.0]
        );
        assert!(merged.shells.is_none());
    }

    #[test]
    fn test_first_system_without_properties_gets_only_sysid() {
        let (merged, _) = fold_all(MergeMode::Stack, vec![cubic(4.0, 4.0, 4.0, 2)]);
        assert_eq!(merged.auxiliary.names(), &[SYS_ID.to_string()]);
        assert_eq!(merged.auxiliary.column(SYS_ID).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_late_property_is_zero_for_earlier_systems() {
        let a = cubic(4.0, 4.0, 4.0, 2);
        let b = with_property(cubic(4.0, 4.0, 4.0, 3), "mass", vec![28.0, 29.0, 30.0]);

        let (merged, log) = fold_all(MergeMode::Stack, vec![a, b]);

        assert_eq!(
            merged.auxiliary.names(),
            &[SYS_ID.to_string(), "mass".to_string()]
        );
        assert_eq!(
            merged.auxiliary.column("mass").unwrap(),
            vec![0.0, 0.0, 28.0, 29.0, 30.0]
        );
        assert!(log
            .notices
            .contains(&Notice::PropertyNew("mass".to_string())));
    }

    #[test]
    fn test_schema_union_and_existing_column_fill() {
        let a = with_property(cubic(4.0, 4.0, 4.0, 2), "charge", vec![1.0, 2.0]);
        let b = with_property(
            with_property(cubic(4.0, 4.0, 4.0, 1), "mass", vec![7.0]),
            " charge ",
            vec![3.0],
        );
        let c = with_property(cubic(4.0, 4.0, 4.0, 2), "spin", vec![0.5, -0.5]);

        let (merged, log) = fold_all(MergeMode::Stack, vec![a, b, c]);
        let table = &merged.auxiliary;

        assert_eq!(
            table.names(),
            &[
                "charge".to_string(),
                SYS_ID.to_string(),
                "mass".to_string(),
                "spin".to_string()
            ]
        );
        assert_eq!(table.nrows(), 5);
        assert_eq!(table.column("charge").unwrap(), vec![1.0, 2.0, 3.0, 0.0, 0.0]);
        assert_eq!(table.column("mass").unwrap(), vec![0.0, 0.0, 7.0, 0.0, 0.0]);
        assert_eq!(table.column("spin").unwrap(), vec![0.0, 0.0, 0.0, 0.5, -0.5]);
        assert_eq!(
            table.column(SYS_ID).unwrap(),
            vec![1.0, 1.0, 2.0, 3.0, 3.0]
        );
        assert!(log
            .notices
            .contains(&Notice::PropertyExisting("charge".to_string())));
    }

    #[test]
    fn test_stack_mode_keeps_box_and_positions() {
        let a = cubic(10.0, 10.0, 10.0, 2);
        let b = cubic(3.0, 3.0, 3.0, 2);
        let b_positions: Vec<[f64; 3]> = b.atoms.iter().map(|a| a.position).collect();

        let (merged, _) = fold_all(MergeMode::Stack, vec![a, b]);

        assert_eq!(merged.lattice, Lattice::orthorhombic(10.0, 10.0, 10.0));
        for (k, original) in b_positions.iter().enumerate() {
            assert_eq!(merged.atoms[2 + k].position, *original);
        }
    }

    #[test]
    fn test_concatenation_is_cumulative_over_three_systems() {
        let systems = vec![
            cubic(10.0, 10.0, 4.0, 1),
            cubic(10.0, 10.0, 6.0, 1),
            cubic(10.0, 10.0, 5.0, 1),
        ];
        let (merged, _) = fold_all(MergeMode::Concatenate(2), systems);

        assert_eq!(merged.lattice.row(2), [0.0, 0.0, 15.0]);
        assert_eq!(merged.atoms[0].position[2], 2.0);
        assert_eq!(merged.atoms[1].position[2], 6.0);
        assert_eq!(merged.atoms[2].position[2], 12.0);
    }

    #[test]
    fn test_shells_padded_and_shifted() {
        let a = cubic(10.0, 10.0, 10.0, 2);
        let mut b = cubic(5.0, 10.0, 10.0, 2);
        b.shells = Some(vec![Some(Atom::new("Si", [0.1, 1.0, 2.0])), None]);
        let c = cubic(5.0, 10.0, 10.0, 1);

        let (merged, _) = fold_all(MergeMode::Concatenate(0), vec![a, b, c]);
        let shells = merged.shells.as_ref().unwrap();

        assert_eq!(shells.len(), merged.atoms.len());
        assert_eq!(shells.len(), 5);
        assert!(shells[0].is_none());
        assert!(shells[1].is_none());
        let shell = shells[2].as_ref().unwrap();
        assert!((shell.position[0] - 10.1).abs() < 1e-12);
        assert!(shells[3].is_none());
        assert!(shells[4].is_none());
        assert_eq!(merged.shell_count(), 1);
    }

    #[test]
    fn test_first_system_shells_kept() {
        let mut a = cubic(10.0, 10.0, 10.0, 1);
        a.shells = Some(vec![Some(Atom::new("O", [0.0, 0.0, 0.1]))]);
        let b = cubic(10.0, 10.0, 10.0, 2);

        let (merged, _) = fold_all(MergeMode::Stack, vec![a, b]);
        let shells = merged.shells.unwrap();
        assert_eq!(shells.len(), 3);
        assert!(shells[0].is_some());
    }

    #[test]
    fn test_comments_appended_in_order() {
        let mut a = cubic(1.0, 1.0, 1.0, 1);
        a.comments = vec!["first".to_string(), "second".to_string()];
        let b = cubic(1.0, 1.0, 1.0, 1);
        let mut c = cubic(1.0, 1.0, 1.0, 1);
        c.comments = vec!["third".to_string(), "first".to_string()];

        let (merged, _) = fold_all(MergeMode::Stack, vec![a, b, c]);
        assert_eq!(merged.comments, vec!["first", "second", "third", "first"]);
    }

    #[test]
    fn test_incoming_sysid_column_is_overwritten() {
        let a = with_property(cubic(1.0, 1.0, 1.0, 2), SYS_ID, vec![7.0, 8.0]);
        let b = with_property(cubic(1.0, 1.0, 1.0, 1), SYS_ID, vec![9.0]);

        let (merged, _) = fold_all(MergeMode::Stack, vec![a, b]);
        assert_eq!(merged.auxiliary.ncols(), 1);
        assert_eq!(merged.auxiliary.column(SYS_ID).unwrap(), vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_row_count_invariant_holds_after_each_fold() {
        let counts = [3usize, 0, 4, 1];
        let mut merger = Merger::new(MergeMode::Concatenate(1));
        let mut log = NoticeLog::new();
        let mut total = 0;

        for (k, &n) in counts.iter().enumerate() {
            let mut s = cubic(2.0, 2.0, 2.0, n);
            if k == 2 {
                s.shells = Some(vec![None; n]);
            }
            merger.fold(s, &mut log);
            total += n;

            let merged = merger.merged();
            assert_eq!(merged.atoms.len(), total);
            assert_eq!(merged.auxiliary.nrows(), total);
            if let Some(shells) = &merged.shells {
                assert_eq!(shells.len(), total);
            }
        }

        assert_eq!(merger.systems(), 4);
        assert_eq!(
            log.notices.last(),
            Some(&Notice::Merged {
                index: 4,
                total: 8
            })
        );
    }
}
