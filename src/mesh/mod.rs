//! Indexed meshes in array-of-structures and structure-of-arrays layouts
//!
//! Both layouts borrow their storage from a `RenderArena`. Loaders fill
//! either one through `MeshStorage`; the textured rasterizer reads either
//! one through `TriangleSource`.

mod arena;
pub mod obj;
pub mod primitives;
pub mod stl;
mod transform;
mod transform_simd;

pub use arena::RenderArena;
pub use transform::{EulerRotation, MeshTransform};
pub use transform_simd::EulerRotationX4;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::rasterizer::{ObjTriangle, Triangle, Vec2, Vec3};

/// One triangle: zero-based indices into vertices, UVs and normals
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Face {
    pub vertex: [u32; 3],
    pub uv: [u32; 3],
    pub normal: [u32; 3],
}

/// Record counts of an indexed mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshCounts {
    pub vertices: usize,
    pub uvs: usize,
    pub normals: usize,
    pub faces: usize,
}

impl MeshCounts {
    /// Arena bytes needed to hold a mesh of these counts
    pub fn byte_len(&self) -> usize {
        self.vertices * std::mem::size_of::<Vec3>()
            + self.uvs * std::mem::size_of::<Vec2>()
            + self.normals * std::mem::size_of::<Vec3>()
            + self.faces * std::mem::size_of::<Face>()
    }
}

/// World placement of a mesh: position, Euler rotation in degrees
/// (X, then Y, then Z) and target height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Vec3,
    pub height: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            height: 1.0,
        }
    }
}

/// Storage a loader can fill record by record
pub trait MeshStorage<'a>: Sized {
    fn alloc(arena: &'a RenderArena, counts: MeshCounts) -> Result<Self>;
    fn set_vertex(&mut self, i: usize, v: Vec3);
    fn set_uv(&mut self, i: usize, uv: Vec2);
    fn set_normal(&mut self, i: usize, n: Vec3);
    fn set_face(&mut self, i: usize, f: Face);
}

/// Anything that yields textured triangles by face index
pub trait TriangleSource {
    fn face_count(&self) -> usize;

    /// `None` if the face references a record outside the mesh
    fn triangle(&self, k: usize) -> Option<ObjTriangle>;
}

impl TriangleSource for [ObjTriangle] {
    fn face_count(&self) -> usize {
        self.len()
    }

    fn triangle(&self, k: usize) -> Option<ObjTriangle> {
        self.get(k).copied()
    }
}

fn gather(
    face: Face,
    vertex: impl Fn(usize) -> Option<Vec3>,
    uv: impl Fn(usize) -> Option<Vec2>,
    normal: impl Fn(usize) -> Option<Vec3>,
) -> Option<ObjTriangle> {
    let mut t = ObjTriangle::default();
    for c in 0..3 {
        t.vertices[c] = vertex(face.vertex[c] as usize)?;
        t.uvs[c] = uv(face.uv[c] as usize)?;
        t.normals[c] = normal(face.normal[c] as usize)?;
    }
    Some(t)
}

fn check_indices(face: Face, k: usize, counts: MeshCounts) -> Result<()> {
    let bad = |kind: &str, idx: u32, count: usize| {
        RasterError::MalformedInput(format!(
            "face {} references {} {} but mesh has {}",
            k, kind, idx, count
        ))
    };
    for c in 0..3 {
        if face.vertex[c] as usize >= counts.vertices {
            return Err(bad("vertex", face.vertex[c], counts.vertices));
        }
        if face.uv[c] as usize >= counts.uvs {
            return Err(bad("uv", face.uv[c], counts.uvs));
        }
        if face.normal[c] as usize >= counts.normals {
            return Err(bad("normal", face.normal[c], counts.normals));
        }
    }
    Ok(())
}

fn check_normal_count(counts: MeshCounts) -> Result<()> {
    if counts.vertices != counts.normals {
        return Err(RasterError::InvalidMesh(format!(
            "{} vertices but {} normals",
            counts.vertices, counts.normals
        )));
    }
    Ok(())
}

/// Indexed mesh, array-of-structures layout
#[derive(Debug)]
pub struct Mesh<'a> {
    pub vertices: &'a mut [Vec3],
    pub uvs: &'a mut [Vec2],
    pub normals: &'a mut [Vec3],
    pub faces: &'a mut [Face],
    pub placement: Placement,
}

impl<'a> Mesh<'a> {
    pub fn counts(&self) -> MeshCounts {
        MeshCounts {
            vertices: self.vertices.len(),
            uvs: self.uvs.len(),
            normals: self.normals.len(),
            faces: self.faces.len(),
        }
    }

    /// Check the loader contract: one normal per vertex and every face
    /// index in range
    pub fn validate(&self) -> Result<()> {
        let counts = self.counts();
        check_normal_count(counts)?;
        for (k, face) in self.faces.iter().enumerate() {
            check_indices(*face, k, counts)?;
        }
        Ok(())
    }

    /// Vertex positions as a flat `x, y, z, x, y, z, ...` buffer
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&*self.vertices)
    }
}

impl<'a> MeshStorage<'a> for Mesh<'a> {
    fn alloc(arena: &'a RenderArena, counts: MeshCounts) -> Result<Self> {
        Ok(Self {
            vertices: arena.alloc_slice(counts.vertices, Vec3::ZERO)?,
            uvs: arena.alloc_slice(counts.uvs, Vec2::default())?,
            normals: arena.alloc_slice(counts.normals, Vec3::ZERO)?,
            faces: arena.alloc_slice(counts.faces, Face::default())?,
            placement: Placement::default(),
        })
    }

    fn set_vertex(&mut self, i: usize, v: Vec3) {
        self.vertices[i] = v;
    }

    fn set_uv(&mut self, i: usize, uv: Vec2) {
        self.uvs[i] = uv;
    }

    fn set_normal(&mut self, i: usize, n: Vec3) {
        self.normals[i] = n;
    }

    fn set_face(&mut self, i: usize, f: Face) {
        self.faces[i] = f;
    }
}

impl TriangleSource for Mesh<'_> {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn triangle(&self, k: usize) -> Option<ObjTriangle> {
        gather(
            *self.faces.get(k)?,
            |i| self.vertices.get(i).copied(),
            |i| self.uvs.get(i).copied(),
            |i| self.normals.get(i).copied(),
        )
    }
}

/// x/y/z components in parallel arrays
#[derive(Debug)]
pub struct Vec3Soa<'a> {
    pub x: &'a mut [f32],
    pub y: &'a mut [f32],
    pub z: &'a mut [f32],
}

impl<'a> Vec3Soa<'a> {
    fn alloc(arena: &'a RenderArena, len: usize) -> Result<Self> {
        Ok(Self {
            x: arena.alloc_slice(len, 0.0)?,
            y: arena.alloc_slice(len, 0.0)?,
            z: arena.alloc_slice(len, 0.0)?,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Vec3> {
        Some(Vec3::new(*self.x.get(i)?, *self.y.get(i)?, *self.z.get(i)?))
    }

    pub fn set(&mut self, i: usize, v: Vec3) {
        self.x[i] = v.x;
        self.y[i] = v.y;
        self.z[i] = v.z;
    }
}

#[derive(Debug)]
pub struct Vec2Soa<'a> {
    pub x: &'a mut [f32],
    pub y: &'a mut [f32],
}

impl Vec2Soa<'_> {
    pub fn get(&self, i: usize) -> Option<Vec2> {
        Some(Vec2::new(*self.x.get(i)?, *self.y.get(i)?))
    }
}

/// Face indices, one array per corner and attribute
#[derive(Debug)]
pub struct FaceSoa<'a> {
    pub vertex: [&'a mut [u32]; 3],
    pub uv: [&'a mut [u32]; 3],
    pub normal: [&'a mut [u32]; 3],
}

impl<'a> FaceSoa<'a> {
    fn alloc(arena: &'a RenderArena, len: usize) -> Result<Self> {
        let corners = || -> Result<[&'a mut [u32]; 3]> {
            Ok([
                arena.alloc_slice(len, 0u32)?,
                arena.alloc_slice(len, 0u32)?,
                arena.alloc_slice(len, 0u32)?,
            ])
        };
        Ok(Self {
            vertex: corners()?,
            uv: corners()?,
            normal: corners()?,
        })
    }

    pub fn len(&self) -> usize {
        self.vertex[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, k: usize) -> Option<Face> {
        if k >= self.len() {
            return None;
        }
        let corner = |a: &[&'a mut [u32]; 3]| [a[0][k], a[1][k], a[2][k]];
        Some(Face {
            vertex: corner(&self.vertex),
            uv: corner(&self.uv),
            normal: corner(&self.normal),
        })
    }

    pub fn set(&mut self, k: usize, f: Face) {
        for c in 0..3 {
            self.vertex[c][k] = f.vertex[c];
            self.uv[c][k] = f.uv[c];
            self.normal[c][k] = f.normal[c];
        }
    }
}

/// Indexed mesh, structure-of-arrays layout for the lane-parallel pipeline
#[derive(Debug)]
pub struct MeshSoa<'a> {
    pub vertices: Vec3Soa<'a>,
    pub uvs: Vec2Soa<'a>,
    pub normals: Vec3Soa<'a>,
    pub faces: FaceSoa<'a>,
    pub placement: Placement,
}

impl<'a> MeshSoa<'a> {
    /// Copy an AoS mesh into a new SoA mesh carved from `arena`
    pub fn from_mesh(arena: &'a RenderArena, mesh: &Mesh) -> Result<Self> {
        let mut soa = Self::alloc(arena, mesh.counts())?;
        for (i, v) in mesh.vertices.iter().enumerate() {
            soa.set_vertex(i, *v);
        }
        for (i, uv) in mesh.uvs.iter().enumerate() {
            soa.set_uv(i, *uv);
        }
        for (i, n) in mesh.normals.iter().enumerate() {
            soa.set_normal(i, *n);
        }
        for (k, f) in mesh.faces.iter().enumerate() {
            soa.set_face(k, *f);
        }
        soa.placement = mesh.placement;
        Ok(soa)
    }

    pub fn counts(&self) -> MeshCounts {
        MeshCounts {
            vertices: self.vertices.len(),
            uvs: self.uvs.x.len(),
            normals: self.normals.len(),
            faces: self.faces.len(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let counts = self.counts();
        check_normal_count(counts)?;
        for k in 0..counts.faces {
            if let Some(face) = self.faces.get(k) {
                check_indices(face, k, counts)?;
            }
        }
        Ok(())
    }

    pub fn vertex(&self, i: usize) -> Option<Vec3> {
        self.vertices.get(i)
    }

    pub fn normal(&self, i: usize) -> Option<Vec3> {
        self.normals.get(i)
    }
}

impl<'a> MeshStorage<'a> for MeshSoa<'a> {
    fn alloc(arena: &'a RenderArena, counts: MeshCounts) -> Result<Self> {
        Ok(Self {
            vertices: Vec3Soa::alloc(arena, counts.vertices)?,
            uvs: Vec2Soa {
                x: arena.alloc_slice(counts.uvs, 0.0)?,
                y: arena.alloc_slice(counts.uvs, 0.0)?,
            },
            normals: Vec3Soa::alloc(arena, counts.normals)?,
            faces: FaceSoa::alloc(arena, counts.faces)?,
            placement: Placement::default(),
        })
    }

    fn set_vertex(&mut self, i: usize, v: Vec3) {
        self.vertices.set(i, v);
    }

    fn set_uv(&mut self, i: usize, uv: Vec2) {
        self.uvs.x[i] = uv.x;
        self.uvs.y[i] = uv.y;
    }

    fn set_normal(&mut self, i: usize, n: Vec3) {
        self.normals.set(i, n);
    }

    fn set_face(&mut self, i: usize, f: Face) {
        self.faces.set(i, f);
    }
}

impl TriangleSource for MeshSoa<'_> {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn triangle(&self, k: usize) -> Option<ObjTriangle> {
        gather(
            self.faces.get(k)?,
            |i| self.vertices.get(i),
            |i| self.uvs.get(i),
            |i| self.normals.get(i),
        )
    }
}

/// Flat-shaded triangle list viewed over a caller's float buffer.
///
/// The buffer holds 12 floats per face (normal, then three vertices), the
/// interchange layout produced by the STL loader.
#[derive(Debug)]
pub struct TriangleSoup<'a> {
    triangles: &'a mut [Triangle],
}

impl<'a> TriangleSoup<'a> {
    pub fn from_floats(floats: &'a mut [f32]) -> Result<Self> {
        let triangles = bytemuck::try_cast_slice_mut(floats).map_err(|e| {
            RasterError::MalformedInput(format!("float buffer is not a triangle list: {}", e))
        })?;
        Ok(Self { triangles })
    }

    pub fn from_triangles(triangles: &'a mut [Triangle]) -> Self {
        Self { triangles }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &*self.triangles
    }

    pub fn triangles_mut(&mut self) -> &mut [Triangle] {
        &mut *self.triangles
    }

    pub fn floats(&self) -> &[f32] {
        bytemuck::cast_slice(&*self.triangles)
    }
}
