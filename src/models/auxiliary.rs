//! # 辅助属性表
//!
//! 每个粒子一行、每个命名属性一列的稠密数值表（行主序存储）。
//! 列名按去除首尾空白后精确匹配（区分大小写），名称到列号的索引
//! 在增删列时整体重建。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`, `merge/`, `options/`, `parsers/` 使用
//! - 无外部模块依赖

use crate::error::{QmergeError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// 保留列名：记录每个粒子来自第几个输入体系（从 1 开始）
pub const SYS_ID: &str = "sysID";

/// 辅助属性表
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuxTable {
    /// 列名（原样保存）
    names: Vec<String>,
    /// 行主序数值，长度 = rows * names.len()
    values: Vec<f64>,
    /// 行数（没有任何列时也有意义）
    rows: usize,
    /// 去空白后的列名 -> 列号
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PartialEq for AuxTable {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.values == other.values && self.rows == other.rows
    }
}

impl AuxTable {
    /// 创建 `rows` 行、没有列的表
    pub fn new(rows: usize) -> Self {
        AuxTable {
            names: Vec::new(),
            values: Vec::new(),
            rows,
            index: HashMap::new(),
        }
    }

    /// 行数
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// 列数
    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    /// 没有任何列
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 按名称查找列号
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name.trim()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols() + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let ncols = self.ncols();
        self.values[row * ncols + col] = value;
    }

    /// 第 `row` 行的所有值
    pub fn row(&self, row: usize) -> &[f64] {
        let ncols = self.ncols();
        &self.values[row * ncols..(row + 1) * ncols]
    }

    /// 按名称取出整列
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column_index(name)?;
        Some((0..self.rows).map(|r| self.get(r, col)).collect())
    }

    /// 添加一列数据（用于解析器构建输入表）
    ///
    /// 列长度必须等于行数，列名不能重复。
    pub fn insert_column(&mut self, name: impl Into<String>, column: Vec<f64>) -> Result<usize> {
        let name = name.into();
        if column.len() != self.rows {
            return Err(QmergeError::InvalidArgument(format!(
                "Auxiliary property '{}' has {} values, expected {}",
                name.trim(),
                column.len(),
                self.rows
            )));
        }
        if self.contains(&name) {
            return Err(QmergeError::InvalidArgument(format!(
                "Duplicate auxiliary property '{}'",
                name.trim()
            )));
        }

        let col = self.push_zero_column(name);
        for (r, v) in column.into_iter().enumerate() {
            self.set(r, col, v);
        }
        Ok(col)
    }

    /// 确保某列存在，返回 (列号, 是否新建)
    ///
    /// 新列对所有已有行填 0。
    pub fn ensure_column(&mut self, name: &str) -> (usize, bool) {
        match self.column_index(name) {
            Some(col) => (col, false),
            None => (self.push_zero_column(name.to_string()), true),
        }
    }

    /// 追加全零列：按新列数重建整张表
    fn push_zero_column(&mut self, name: String) -> usize {
        let old_cols = self.ncols();
        let new_cols = old_cols + 1;

        let mut values = vec![0.0; self.rows * new_cols];
        for r in 0..self.rows {
            values[r * new_cols..r * new_cols + old_cols]
                .copy_from_slice(&self.values[r * old_cols..(r + 1) * old_cols]);
        }

        self.values = values;
        self.names.push(name);
        self.rebuild_index();
        old_cols
    }

    /// 删除一列，返回是否存在
    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(col) = self.column_index(name) else {
            return false;
        };

        let old_cols = self.ncols();
        let mut values = Vec::with_capacity(self.rows * (old_cols - 1));
        for r in 0..self.rows {
            for c in 0..old_cols {
                if c != col {
                    values.push(self.values[r * old_cols + c]);
                }
            }
        }

        self.values = values;
        self.names.remove(col);
        self.rebuild_index();
        true
    }

    /// 追加 `extra` 行，所有列填 0
    pub fn grow_rows(&mut self, extra: usize) {
        self.rows += extra;
        self.values.resize(self.rows * self.ncols(), 0.0);
    }

    /// 只保留 `keep[r]` 为真的行
    pub fn retain_rows(&mut self, keep: &[bool]) {
        let ncols = self.ncols();
        let mut values = Vec::with_capacity(self.values.len());
        let mut rows = 0;
        for (r, &k) in keep.iter().enumerate().take(self.rows) {
            if k {
                values.extend_from_slice(&self.values[r * ncols..(r + 1) * ncols]);
                rows += 1;
            }
        }
        self.values = values;
        self.rows = rows;
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.trim().to_string(), i))
            .collect();
    }
}
