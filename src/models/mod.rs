//! # 数据模型模块
//!
//! 定义统一的原子体系数据模型：晶格（盒子）、粒子、壳层与辅助属性表。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `merge/`, `options/` 和 `commands/` 使用
//! - 子模块: structure, auxiliary

pub mod auxiliary;
pub mod structure;

pub use auxiliary::{AuxTable, SYS_ID};
pub use structure::{Atom, Lattice, System};
