//! # 原子体系数据模型
//!
//! 定义统一的原子体系表示，可以从不同格式解析并写出为不同格式。
//! 模型内部统一使用笛卡尔坐标 (Å)。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `merge/`, `options/` 使用
//! - 使用 `models/auxiliary.rs`

use super::auxiliary::AuxTable;
use serde::{Deserialize, Serialize};

/// 晶格（模拟盒子）表示
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Default for Lattice {
    fn default() -> Self {
        Lattice {
            matrix: [[0.0; 3]; 3],
        }
    }
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let alpha_rad = alpha.to_radians();
        let beta_rad = beta.to_radians();
        let gamma_rad = gamma.to_radians();

        let cos_alpha = alpha_rad.cos();
        let cos_beta = beta_rad.cos();
        let cos_gamma = gamma_rad.cos();
        let sin_gamma = gamma_rad.sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();
        let c_vec = [c1, c2, c3];

        Lattice {
            matrix: [a_vec, b_vec, c_vec],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 正交盒子
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Lattice {
            matrix: [[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]],
        }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let a_vec = self.matrix[0];
        let b_vec = self.matrix[1];
        let c_vec = self.matrix[2];

        let a = norm(a_vec);
        let b = norm(b_vec);
        let c = norm(c_vec);

        let alpha = (dot(b_vec, c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(a_vec, c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(a_vec, b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];

        // 行列式计算
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    /// 第 `axis` 个晶格向量
    pub fn row(&self, axis: usize) -> [f64; 3] {
        self.matrix[axis]
    }

    /// 把 `v` 累加到第 `axis` 个晶格向量上
    pub fn extend_row(&mut self, axis: usize, v: [f64; 3]) {
        for k in 0..3 {
            self.matrix[axis][k] += v[k];
        }
    }

    /// 分数坐标转笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 笛卡尔坐标转分数坐标
    ///
    /// 晶格矩阵奇异时（例如没有盒子信息的 XYZ 文件）原样返回。
    pub fn to_fractional(&self, cart: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        let det = self.volume();

        if det.abs() < 1e-10 {
            return cart;
        }

        // r = f · M  =>  f = r · M⁻¹
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ];

        [
            cart[0] * inv[0][0] + cart[1] * inv[1][0] + cart[2] * inv[2][0],
            cart[0] * inv[0][1] + cart[1] * inv[1][1] + cart[2] * inv[2][1],
            cart[0] * inv[0][2] + cart[1] * inv[1][2] + cart[2] * inv[2][2],
        ]
    }

    /// 晶格是否退化（体积为零）
    pub fn is_degenerate(&self) -> bool {
        self.volume().abs() < 1e-10
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// 粒子（原子核心或壳层）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 笛卡尔坐标 [x, y, z] (Å)
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }

    /// 平移
    pub fn translate(&mut self, v: [f64; 3]) {
        for k in 0..3 {
            self.position[k] += v[k];
        }
    }
}

/// 原子体系
///
/// `shells` 存在时与 `atoms` 一一对应：`shells[i]` 是第 i 个粒子的壳层，
/// `None` 表示该粒子没有壳层。`auxiliary` 的行数始终等于 `atoms.len()`。
#[derive(Debug, Clone, Serialize)]
pub struct System {
    /// 结构名称
    pub name: String,

    /// 盒子
    pub lattice: Lattice,

    /// 粒子列表
    pub atoms: Vec<Atom>,

    /// 可选：壳层（核-壳模型）
    pub shells: Option<Vec<Option<Atom>>>,

    /// 辅助属性表
    pub auxiliary: AuxTable,

    /// 注释行
    pub comments: Vec<String>,

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl System {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        let rows = atoms.len();
        System {
            name: name.into(),
            lattice,
            atoms,
            shells: None,
            auxiliary: AuxTable::new(rows),
            comments: Vec::new(),
            source_format: None,
        }
    }

    /// 空体系（合并的起点）
    pub fn empty() -> Self {
        System::new("", Lattice::default(), Vec::new())
    }

    /// 实际存在的壳层数目
    pub fn shell_count(&self) -> usize {
        self.shells
            .as_ref()
            .map(|s| s.iter().filter(|x| x.is_some()).count())
            .unwrap_or(0)
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 按出现顺序列出不同元素
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.contains(&atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }
}
