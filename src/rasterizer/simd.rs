//! 4-wide lane-parallel mirror of the vector kernel
//!
//! Every scalar becomes an `f32x4`; a "broadcast" register holds the same
//! value in all lanes. Horizontal reductions fold the four lanes and splat
//! the result back so it combines with other registers lane-for-lane.
//!
//! Reductions pair lanes (0,2) and (1,3) first, so sums are not bit-exact
//! with a left-to-right scalar loop.

use wide::f32x4;

use super::math::{Mat3, Vec3};

pub const LANES: usize = 4;

#[inline]
fn fold(v: f32x4, op: impl Fn(f32, f32) -> f32) -> f32 {
    let a = v.to_array();
    op(op(a[0], a[2]), op(a[1], a[3]))
}

/// Sum of all lanes
#[inline]
pub fn hsum(v: f32x4) -> f32 {
    fold(v, |a, b| a + b)
}

#[inline]
pub fn hsum_splat(v: f32x4) -> f32x4 {
    f32x4::splat(hsum(v))
}

#[inline]
pub fn hmin_splat(v: f32x4) -> f32x4 {
    f32x4::splat(fold(v, f32::min))
}

#[inline]
pub fn hmax_splat(v: f32x4) -> f32x4 {
    f32x4::splat(fold(v, f32::max))
}

/// Load four consecutive floats starting at `i`.
#[inline]
pub fn load(s: &[f32], i: usize) -> f32x4 {
    f32x4::new([s[i], s[i + 1], s[i + 2], s[i + 3]])
}

#[inline]
pub fn store(s: &mut [f32], i: usize, v: f32x4) {
    s[i..i + LANES].copy_from_slice(&v.to_array());
}

/// Four `Vec3`s in structure-of-arrays form
#[derive(Debug, Clone, Copy)]
pub struct Vec3x4 {
    pub x: f32x4,
    pub y: f32x4,
    pub z: f32x4,
}

impl Vec3x4 {
    pub fn splat(s: f32) -> Self {
        Self {
            x: f32x4::splat(s),
            y: f32x4::splat(s),
            z: f32x4::splat(s),
        }
    }

    /// Broadcast one vector into every lane
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: f32x4::splat(v.x),
            y: f32x4::splat(v.y),
            z: f32x4::splat(v.z),
        }
    }

    pub fn load(x: &[f32], y: &[f32], z: &[f32], i: usize) -> Self {
        Self {
            x: load(x, i),
            y: load(y, i),
            z: load(z, i),
        }
    }

    pub fn store(self, x: &mut [f32], y: &mut [f32], z: &mut [f32], i: usize) {
        store(x, i, self.x);
        store(y, i, self.y);
        store(z, i, self.z);
    }

    pub fn add(self, o: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x + o.x,
            y: self.y + o.y,
            z: self.z + o.z,
        }
    }

    pub fn sub(self, o: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x - o.x,
            y: self.y - o.y,
            z: self.z - o.z,
        }
    }

    /// Multiply every component by a per-lane factor
    pub fn mul_lanes(self, t: f32x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x * t,
            y: self.y * t,
            z: self.z * t,
        }
    }


    pub fn hsum_splat(self) -> Vec3x4 {
        Vec3x4 {
            x: hsum_splat(self.x),
            y: hsum_splat(self.y),
            z: hsum_splat(self.z),
        }
    }

    /// Extract one lane as a scalar vector
    pub fn lane(self, i: usize) -> Vec3 {
        Vec3::new(self.x.to_array()[i], self.y.to_array()[i], self.z.to_array()[i])
    }
}

/// Broadcast 3x3 matrix
#[derive(Debug, Clone, Copy)]
pub struct Mat3x4 {
    pub e: [[f32x4; 3]; 3],
}

impl Mat3x4 {
    pub fn from_mat3(m: &Mat3) -> Self {
        let row = |r: [f32; 3]| [f32x4::splat(r[0]), f32x4::splat(r[1]), f32x4::splat(r[2])];
        Self {
            e: [row(m.e[0]), row(m.e[1]), row(m.e[2])],
        }
    }

    pub fn mul_vec(&self, v: Vec3x4) -> Vec3x4 {
        let e = &self.e;
        Vec3x4 {
            x: e[0][0] * v.x + e[0][1] * v.y + e[0][2] * v.z,
            y: e[1][0] * v.x + e[1][1] * v.y + e[1][2] * v.z,
            z: e[2][0] * v.x + e[2][1] * v.y + e[2][2] * v.z,
        }
    }
}
