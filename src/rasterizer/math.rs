//! Vector math for 3D rendering
//!
//! Scalar kernel shared by the transform pipeline, the camera and the
//! rasterizer. Everything here is a pure function; division by zero follows
//! IEEE semantics (inf/NaN) and never traps.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector (also used for points and 0-255 RGB colors)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub type Point3 = Vec3;

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(s: f32) -> Self {
        Self { x: s, y: s, z: s }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn len(self) -> f32 {
        self.len_squared().sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// A zero-length input yields NaN components; callers must not
    /// normalize degenerate vectors.
    pub fn normalize(self) -> Vec3 {
        self / self.len()
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest absolute component difference, handy for tolerance checks
    pub fn max_abs_diff(self, other: Vec3) -> f32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    fn div(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x / s,
            y: self.y / s,
            z: self.z / s,
        }
    }
}

/// 2D Vector (for texture coordinates)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

/// Integer pixel coordinate (post-projection)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Row-major 3x3 matrix, only ever used as a rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub e: [[f32; 3]; 3],
}

impl Mat3 {
    pub const fn from_rows(e: [[f32; 3]; 3]) -> Self {
        Self { e }
    }

    /// Rotation about X (roll), angle in degrees
    pub fn roll(degrees: f32) -> Self {
        let (s, c) = degrees_to_radians(degrees).sin_cos();
        Mat3::from_rows([[1.0, 0.0, 0.0], [0.0, c, s], [0.0, -s, c]])
    }

    /// Rotation about Y (pitch), angle in degrees
    pub fn pitch(degrees: f32) -> Self {
        let (s, c) = degrees_to_radians(degrees).sin_cos();
        Mat3::from_rows([[c, 0.0, -s], [0.0, 1.0, 0.0], [s, 0.0, c]])
    }

    /// Rotation about Z (yaw), angle in degrees
    pub fn yaw(degrees: f32) -> Self {
        let (s, c) = degrees_to_radians(degrees).sin_cos();
        Mat3::from_rows([[c, s, 0.0], [-s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        let e = &self.e;
        Vec3 {
            x: e[0][0] * v.x + e[0][1] * v.y + e[0][2] * v.z,
            y: e[1][0] * v.x + e[1][1] * v.y + e[1][2] * v.z,
            z: e[2][0] * v.x + e[2][1] * v.y + e[2][2] * v.z,
        }
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        self.mul_vec(v)
    }
}

/// Closed range of floats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const UNIT: Interval = Interval { min: 0.0, max: 1.0 };
    pub const COLOR: Interval = Interval { min: 0.0, max: 255.0 };

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    pub fn surrounds(self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    pub fn clamp(self, x: f32) -> f32 {
        if x < self.min {
            self.min
        } else if x > self.max {
            self.max
        } else {
            x
        }
    }
}

pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Barycentric weights of pixel `p` in the screen triangle (t0, t1, t2).
///
/// Returns (w0, w1, w2) summing to 1. Triangles whose doubled screen area is
/// below one pixel are degenerate and yield (-1, 1, 1), which every inside
/// test rejects.
///
/// Vertices may sit anywhere in the `i32` range (projection saturates far
/// off-screen points), so differences are taken in `i64`.
pub fn barycentric(t0: Vec2i, t1: Vec2i, t2: Vec2i, p: Vec2i) -> Vec3 {
    let d = |a: i32, b: i32| (a as i64 - b as i64) as f32;
    let u = Vec3::new(d(t2.x, t0.x), d(t1.x, t0.x), d(t0.x, p.x))
        .cross(Vec3::new(d(t2.y, t0.y), d(t1.y, t0.y), d(t0.y, p.y)));

    if u.z.abs() < 1.0 {
        return Vec3::new(-1.0, 1.0, 1.0);
    }

    Vec3::new(1.0 - (u.x + u.y) / u.z, u.y / u.z, u.x / u.z)
}
