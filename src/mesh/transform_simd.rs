//! Lane-parallel transform pipeline over the SoA layout
//!
//! Four vertices per iteration. A remainder of fewer than four goes through
//! the scalar kernel with the same fit and matrices.

use tracing::trace;
use wide::f32x4;

use super::transform::{EulerRotation, Fit, MeshTransform};
use super::{check_normal_count, MeshSoa, Placement, Vec3Soa};
use crate::error::Result;
use crate::rasterizer::simd::{hmax_splat, hmin_splat, Mat3x4, Vec3x4, LANES};
use crate::rasterizer::Vec3;

/// Broadcast mirror of `EulerRotation`
#[derive(Debug, Clone, Copy)]
pub struct EulerRotationX4 {
    roll: Mat3x4,
    pitch: Mat3x4,
    yaw: Mat3x4,
}

impl EulerRotationX4 {
    pub fn new(r: &EulerRotation) -> Self {
        Self {
            roll: Mat3x4::from_mat3(&r.roll),
            pitch: Mat3x4::from_mat3(&r.pitch),
            yaw: Mat3x4::from_mat3(&r.yaw),
        }
    }

    #[inline]
    pub fn apply(&self, v: Vec3x4) -> Vec3x4 {
        self.yaw.mul_vec(self.pitch.mul_vec(self.roll.mul_vec(v)))
    }
}

fn full_groups(len: usize) -> usize {
    len - len % LANES
}

/// Centroid and vertical extent in one lane-parallel pass
fn scan(vertices: &Vec3Soa, height: f32) -> Result<Fit> {
    let n = vertices.len();
    let full = full_groups(n);

    let mut sum = Vec3x4::splat(0.0);
    let mut lo = f32x4::splat(f32::INFINITY);
    let mut hi = f32x4::splat(f32::NEG_INFINITY);
    for i in (0..full).step_by(LANES) {
        let v = Vec3x4::load(&vertices.x, &vertices.y, &vertices.z, i);
        sum = sum.add(v);
        lo = lo.min(v.y);
        hi = hi.max(v.y);
    }

    let mut total = sum.hsum_splat().lane(0);
    let mut min_y = hmin_splat(lo).to_array()[0];
    let mut max_y = hmax_splat(hi).to_array()[0];
    for i in full..n {
        let y = vertices.y[i];
        total += Vec3::new(vertices.x[i], y, vertices.z[i]);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    Fit::new(total, n, min_y, max_y, height)
}

/// Apply `f4` to every full lane group of `s` and `f1` to the tail
fn for_each_lane_group(
    s: &mut Vec3Soa,
    f4: impl Fn(Vec3x4) -> Vec3x4,
    f1: impl Fn(Vec3) -> Vec3,
) {
    let n = s.len();
    let full = full_groups(n);
    for i in (0..full).step_by(LANES) {
        let out = f4(Vec3x4::load(&s.x, &s.y, &s.z, i));
        out.store(s.x, s.y, s.z, i);
    }
    for i in full..n {
        let v = Vec3::new(s.x[i], s.y[i], s.z[i]);
        s.set(i, f1(v));
    }
}

impl MeshTransform for MeshSoa<'_> {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    fn place(&mut self, placement: Placement) -> Result<()> {
        check_normal_count(self.counts())?;
        let fit = scan(&self.vertices, placement.height)?;
        let rotation = EulerRotation::from_degrees(placement.rotation);
        let rotation4 = EulerRotationX4::new(&rotation);
        trace!(
            centroid = ?fit.centroid,
            scale = fit.scale,
            vertices = self.vertices.len(),
            "placing soa mesh"
        );

        let centroid = Vec3x4::from_vec3(fit.centroid);
        let scale = f32x4::splat(fit.scale);
        let position = Vec3x4::from_vec3(placement.position);
        for_each_lane_group(
            &mut self.vertices,
            |v| rotation4.apply(v.sub(centroid).mul_lanes(scale)).add(position),
            |v| fit.apply(&rotation, placement.position, v),
        );
        for_each_lane_group(
            &mut self.normals,
            |n| rotation4.apply(n),
            |n| rotation.apply(n),
        );
        self.placement = placement;
        Ok(())
    }

    fn shift_by(&mut self, delta: Vec3) {
        let delta4 = Vec3x4::from_vec3(delta);
        for_each_lane_group(&mut self.vertices, |v| v.add(delta4), |v| v + delta);
        self.placement.position += delta;
    }

    fn rotate_by(&mut self, delta: Vec3) {
        let rotation = EulerRotation::from_degrees(delta);
        let rotation4 = EulerRotationX4::new(&rotation);
        let pivot = self.placement.position;
        let pivot4 = Vec3x4::from_vec3(pivot);
        for_each_lane_group(
            &mut self.vertices,
            |v| rotation4.apply(v.sub(pivot4)).add(pivot4),
            |v| rotation.apply(v - pivot) + pivot,
        );
        for_each_lane_group(
            &mut self.normals,
            |n| rotation4.apply(n),
            |n| rotation.apply(n),
        );
        self.placement.rotation += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterError;
    use crate::mesh::{Mesh, MeshCounts, MeshStorage, RenderArena};

    fn scattered_mesh(arena: &RenderArena, n: usize) -> Mesh<'_> {
        let counts = MeshCounts {
            vertices: n,
            uvs: 0,
            normals: n,
            faces: 0,
        };
        let mut mesh = Mesh::alloc(arena, counts).unwrap();
        for i in 0..n {
            let t = i as f32;
            mesh.set_vertex(i, Vec3::new(t.sin() * 3.0, t * 0.7 - 2.0, (t * 1.3).cos()));
            mesh.set_normal(i, Vec3::new(t.cos(), 0.5, t.sin()).normalize());
        }
        mesh
    }

    fn assert_layouts_agree(aos: &Mesh, soa: &MeshSoa) {
        for i in 0..aos.vertices.len() {
            let v = soa.vertex(i).unwrap();
            let n = soa.normal(i).unwrap();
            assert!(v.max_abs_diff(aos.vertices[i]) < 1e-4, "vertex {}: {:?} vs {:?}", i, v, aos.vertices[i]);
            assert!(n.max_abs_diff(aos.normals[i]) < 1e-5, "normal {}", i);
        }
        assert_eq!(soa.placement, aos.placement);
    }

    fn check_place_matches_scalar(n: usize) {
        let arena = RenderArena::with_capacity(1 << 16);
        let mut aos = scattered_mesh(&arena, n);
        let mut soa = MeshSoa::from_mesh(&arena, &aos).unwrap();
        let placement = Placement {
            position: Vec3::new(-1.0, 2.0, -6.0),
            rotation: Vec3::new(15.0, -40.0, 75.0),
            height: 2.5,
        };
        aos.place(placement).unwrap();
        soa.place(placement).unwrap();
        assert_layouts_agree(&aos, &soa);
    }

    #[test]
    fn test_place_matches_scalar_full_groups() {
        check_place_matches_scalar(8);
    }

    #[test]
    fn test_place_transforms_the_tail() {
        check_place_matches_scalar(7);
        check_place_matches_scalar(3);
    }

    #[test]
    fn test_shift_and_rotate_match_scalar() {
        let arena = RenderArena::with_capacity(1 << 16);
        let mut aos = scattered_mesh(&arena, 6);
        let mut soa = MeshSoa::from_mesh(&arena, &aos).unwrap();
        for m in [&mut aos as &mut dyn MeshTransform, &mut soa] {
            m.shift_by(Vec3::new(1.0, 0.0, -2.0));
            m.rotate_by(Vec3::new(0.0, 30.0, 0.0));
        }
        assert_layouts_agree(&aos, &soa);
    }

    #[test]
    fn test_flat_soa_mesh_is_rejected() {
        let arena = RenderArena::with_capacity(4096);
        let counts = MeshCounts {
            vertices: 5,
            uvs: 0,
            normals: 5,
            faces: 0,
        };
        let mut soa = MeshSoa::alloc(&arena, counts).unwrap();
        assert!(matches!(
            soa.place(Placement::default()),
            Err(RasterError::InvalidMesh(_))
        ));
    }
}
