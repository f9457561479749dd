//! Built-in test geometry

use super::{Face, Mesh, MeshCounts, MeshStorage, RenderArena};
use crate::error::Result;
use crate::rasterizer::{Triangle, Vec2, Vec3};

const FACE_NORMALS: [Vec3; 6] = [
    Vec3::new(0.0, 0.0, 1.0),  // Front
    Vec3::new(0.0, 0.0, -1.0), // Back
    Vec3::new(0.0, 1.0, 0.0),  // Top
    Vec3::new(0.0, -1.0, 0.0), // Bottom
    Vec3::new(1.0, 0.0, 0.0),  // Right
    Vec3::new(-1.0, 0.0, 0.0), // Left
];

/// Four corners per face, unit half-extent
const CORNERS: [[f32; 3]; 24] = [
    // Front
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    // Back
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    // Top
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    // Bottom
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    // Right
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    // Left
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
];

const UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

fn corner(i: usize, size: f32) -> Vec3 {
    let [x, y, z] = CORNERS[i];
    Vec3::new(x, y, z) * (size / 2.0)
}

/// Axis-aligned cube of edge `size` centered at the origin, two flat
/// triangles per face
pub fn cube_triangles(size: f32) -> [Triangle; 12] {
    let mut out = [Triangle::default(); 12];
    for (face, n) in FACE_NORMALS.iter().enumerate() {
        let base = face * 4;
        let v = |k: usize| corner(base + k, size);
        out[face * 2] = Triangle::new(*n, v(0), v(1), v(2));
        out[face * 2 + 1] = Triangle::new(*n, v(0), v(2), v(3));
    }
    out
}

/// Indexed, textured cube of edge `size`: 24 vertices with one normal each,
/// four shared UVs and 12 faces
pub fn cube_mesh(arena: &RenderArena, size: f32) -> Result<Mesh<'_>> {
    let counts = MeshCounts {
        vertices: 24,
        uvs: 4,
        normals: 24,
        faces: 12,
    };
    let mut mesh = Mesh::alloc(arena, counts)?;
    for (i, uv) in UVS.iter().enumerate() {
        mesh.set_uv(i, *uv);
    }
    for (face, n) in FACE_NORMALS.iter().enumerate() {
        let base = face * 4;
        for k in 0..4 {
            mesh.set_vertex(base + k, corner(base + k, size));
            mesh.set_normal(base + k, *n);
        }
        let b = base as u32;
        mesh.set_face(face * 2, Face {
            vertex: [b, b + 1, b + 2],
            uv: [0, 1, 2],
            normal: [b, b + 1, b + 2],
        });
        mesh.set_face(face * 2 + 1, Face {
            vertex: [b, b + 2, b + 3],
            uv: [0, 2, 3],
            normal: [b, b + 2, b + 3],
        });
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_mesh_is_valid() {
        let arena = RenderArena::with_capacity(4096);
        let mesh = cube_mesh(&arena, 2.0).unwrap();
        mesh.validate().unwrap();
        assert_eq!(mesh.counts().faces, 12);
        assert!(mesh.vertices.iter().all(|v| v.x.abs() == 1.0 && v.y.abs() == 1.0));
    }

    #[test]
    fn test_cube_triangles_lie_on_their_face() {
        for t in cube_triangles(1.0) {
            for v in t.vertices() {
                assert!((v.dot(t.n) - 0.5).abs() < 1e-6);
            }
        }
    }
}
