//! # 合并方向解析
//!
//! 把单个字符解析为合并模式：`x/y/z`（不区分大小写）表示沿该轴拼接盒子，
//! 其余任何值都表示直接堆叠、不做拼接。解析从不失败。
//!
//! ## 依赖关系
//! - 被 `merge/engine.rs`, `merge/fold.rs`, `commands/merge.rs` 使用

use std::fmt;

/// 合并模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// 直接堆叠，不改变坐标和盒子
    Stack,
    /// 沿某轴拼接 (0 = x, 1 = y, 2 = z)
    Concatenate(usize),
}

impl MergeMode {
    /// 由方向字符解析
    pub fn from_char(c: char) -> Self {
        match c {
            'x' | 'X' => MergeMode::Concatenate(0),
            'y' | 'Y' => MergeMode::Concatenate(1),
            'z' | 'Z' => MergeMode::Concatenate(2),
            _ => MergeMode::Stack,
        }
    }

    /// 由命令行字符串解析（只看第一个字符，空串视为堆叠）
    pub fn from_arg(arg: &str) -> Self {
        arg.trim()
            .chars()
            .next()
            .map(MergeMode::from_char)
            .unwrap_or(MergeMode::Stack)
    }

    /// 拼接轴
    pub fn axis(&self) -> Option<usize> {
        match self {
            MergeMode::Stack => None,
            MergeMode::Concatenate(axis) => Some(*axis),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Stack => write!(f, "no concatenation"),
            MergeMode::Concatenate(axis) => {
                let name = ["X", "Y", "Z"][*axis];
                write!(f, "concatenation along {}", name)
            }
        }
    }
}
