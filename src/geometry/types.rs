//! Plain value types used at the public boundary.
//!
//! These are deliberately behaviour-free: flat fields, row-major storage,
//! no invariants enforced. All actual math happens on `nalgebra` types and
//! crosses the boundary through the `From` conversions below.
//!
//! Note that `Quaternion` carries no unit-norm invariant; callers must not
//! assume normalization unless the producing operation guarantees it.

use nalgebra as na;

/// A simple 2D vector (e.g. a pixel coordinate or focal-length pair).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A simple 3D vector (e.g. a map point or translation).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A 3D orientation as a quaternion. Storage only, no manipulation methods.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// A 3x3 matrix stored row-major (first row, then second row, etc).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub data: [f64; 9],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self { data: [0.0; 9] }
    }
}

impl Matrix3 {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn identity() -> Self {
        let mut m = Self::zeros();
        m.data[0] = 1.0;
        m.data[4] = 1.0;
        m.data[8] = 1.0;
        m
    }

    /// Element access by (row, column).
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * 3 + col]
    }
}

/// A 4x4 matrix stored row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4 {
    pub data: [f64; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self { data: [0.0; 16] }
    }
}

impl Matrix4 {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn identity() -> Self {
        let mut m = Self::zeros();
        for i in 0..4 {
            m.data[i * 4 + i] = 1.0;
        }
        m
    }

    /// Element access by (row, column).
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * 4 + col]
    }
}

impl From<na::Vector2<f64>> for Vector2 {
    fn from(v: na::Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vector2> for na::Vector2<f64> {
    fn from(v: Vector2) -> Self {
        na::Vector2::new(v.x, v.y)
    }
}

impl From<na::Vector3<f64>> for Vector3 {
    fn from(v: na::Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vector3> for na::Vector3<f64> {
    fn from(v: Vector3) -> Self {
        na::Vector3::new(v.x, v.y, v.z)
    }
}

impl From<na::UnitQuaternion<f64>> for Quaternion {
    fn from(q: na::UnitQuaternion<f64>) -> Self {
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

impl From<na::Matrix3<f64>> for Matrix3 {
    fn from(m: na::Matrix3<f64>) -> Self {
        let mut data = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                data[row * 3 + col] = m[(row, col)];
            }
        }
        Self { data }
    }
}

impl From<Matrix3> for na::Matrix3<f64> {
    fn from(m: Matrix3) -> Self {
        na::Matrix3::from_fn(|row, col| m.at(row, col))
    }
}

impl From<na::Matrix4<f64>> for Matrix4 {
    fn from(m: na::Matrix4<f64>) -> Self {
        let mut data = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                data[row * 4 + col] = m[(row, col)];
            }
        }
        Self { data }
    }
}

impl From<Matrix4> for na::Matrix4<f64> {
    fn from(m: Matrix4) -> Self {
        na::Matrix4::from_fn(|row, col| m.at(row, col))
    }
}
