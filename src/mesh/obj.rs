//! Wavefront OBJ text loader
//!
//! Two passes: count records, allocate once from the arena, then fill.
//! Only triangulated `f a/b/c a/b/c a/b/c` faces are accepted.

use tracing::debug;

use super::{check_normal_count, Face, MeshCounts, MeshStorage, RenderArena};
use crate::error::{RasterError, Result};
use crate::rasterizer::{Vec2, Vec3};

fn malformed(line: usize, msg: impl std::fmt::Display) -> RasterError {
    RasterError::MalformedInput(format!("obj line {}: {}", line, msg))
}

/// Parse at least `min` and at most `max` floats from the rest of a record
fn floats<'t>(
    line: usize,
    fields: impl Iterator<Item = &'t str>,
    min: usize,
    max: usize,
) -> Result<[f32; 3]> {
    let mut out = [0.0; 3];
    let mut n = 0;
    for field in fields {
        if n == max {
            return Err(malformed(line, format!("expected at most {} values", max)));
        }
        let value: f32 = field
            .parse()
            .map_err(|_| malformed(line, format!("bad number {:?}", field)))?;
        if n < 3 {
            out[n] = value;
        }
        n += 1;
    }
    if n < min {
        return Err(malformed(line, format!("expected at least {} values, got {}", min, n)));
    }
    Ok(out)
}

/// One-based OBJ index to zero-based, checked against the record count
fn index(line: usize, field: &str, kind: &str, count: usize) -> Result<u32> {
    let i: u32 = field
        .parse()
        .map_err(|_| malformed(line, format!("bad {} index {:?}", kind, field)))?;
    if i == 0 || i as usize > count {
        return Err(malformed(
            line,
            format!("{} index {} outside 1..={}", kind, i, count),
        ));
    }
    Ok(i - 1)
}

fn face<'t>(line: usize, fields: impl Iterator<Item = &'t str>, counts: &MeshCounts) -> Result<Face> {
    let mut f = Face::default();
    let mut corners = 0;
    for corner in fields {
        if corners == 3 {
            return Err(malformed(line, "only triangular faces are supported"));
        }
        let parts: Vec<&str> = corner.split('/').collect();
        if parts.len() != 3 {
            return Err(malformed(
                line,
                format!("face corner {:?} is not vertex/uv/normal", corner),
            ));
        }
        f.vertex[corners] = index(line, parts[0], "vertex", counts.vertices)?;
        f.uv[corners] = index(line, parts[1], "uv", counts.uvs)?;
        f.normal[corners] = index(line, parts[2], "normal", counts.normals)?;
        corners += 1;
    }
    if corners != 3 {
        return Err(malformed(line, "only triangular faces are supported"));
    }
    Ok(f)
}

/// Count records without parsing them
pub fn count_records(text: &str) -> MeshCounts {
    let mut counts = MeshCounts::default();
    for line in text.lines() {
        match line.split_whitespace().next() {
            Some("v") => counts.vertices += 1,
            Some("vt") => counts.uvs += 1,
            Some("vn") => counts.normals += 1,
            Some("f") => counts.faces += 1,
            _ => {}
        }
    }
    counts
}

/// Parse OBJ text into either mesh layout.
///
/// Fails with `MalformedInput` (naming the line) on bad numbers, non-triangle
/// faces or out-of-range indices, and with `InvalidMesh` when the vertex and
/// normal counts differ. Nothing partial is returned.
pub fn parse_obj<'a, M: MeshStorage<'a>>(text: &str, arena: &'a RenderArena) -> Result<M> {
    let counts = count_records(text);
    check_normal_count(counts)?;
    debug!(
        vertices = counts.vertices,
        uvs = counts.uvs,
        normals = counts.normals,
        faces = counts.faces,
        "parsing obj"
    );

    let mut mesh = M::alloc(arena, counts)?;
    let (mut v, mut vt, mut vn, mut f) = (0, 0, 0, 0);
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let mut fields = raw.split_whitespace();
        match fields.next() {
            Some("v") => {
                let [x, y, z] = floats(line, fields, 3, 4)?;
                mesh.set_vertex(v, Vec3::new(x, y, z));
                v += 1;
            }
            Some("vt") => {
                let [x, y, _] = floats(line, fields, 2, 3)?;
                mesh.set_uv(vt, Vec2::new(x, y));
                vt += 1;
            }
            Some("vn") => {
                let [x, y, z] = floats(line, fields, 3, 3)?;
                mesh.set_normal(vn, Vec3::new(x, y, z));
                vn += 1;
            }
            Some("f") => {
                let record = face(line, fields, &counts)?;
                mesh.set_face(f, record);
                f += 1;
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Read and parse an OBJ file
pub fn load_obj<'a, M: MeshStorage<'a>>(
    path: impl AsRef<std::path::Path>,
    arena: &'a RenderArena,
) -> Result<M> {
    let text = std::fs::read_to_string(path)?;
    parse_obj(&text, arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, MeshSoa, TriangleSource};

    const QUAD: &str = "\
# two triangles
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0 1.0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
usemtl ignored
f 1/1/1 2/2/2 3/3/3
f 1/1/1 3/3/3 4/4/4
";

    #[test]
    fn test_counts_and_indices() {
        let arena = RenderArena::with_capacity(1 << 12);
        let mesh: Mesh = parse_obj(QUAD, &arena).unwrap();
        assert_eq!(
            mesh.counts(),
            MeshCounts {
                vertices: 4,
                uvs: 4,
                normals: 4,
                faces: 2
            }
        );
        assert_eq!(mesh.faces[1].vertex, [0, 2, 3]);
        assert_eq!(mesh.vertices[3], Vec3::new(0.0, 1.0, 0.0));
        mesh.validate().unwrap();
    }

    #[test]
    fn test_both_layouts_agree() {
        let arena = RenderArena::with_capacity(1 << 12);
        let aos: Mesh = parse_obj(QUAD, &arena).unwrap();
        let soa: MeshSoa = parse_obj(QUAD, &arena).unwrap();
        for k in 0..2 {
            assert_eq!(aos.triangle(k), soa.triangle(k));
        }
    }

    #[test]
    fn test_quad_face_is_rejected() {
        let text = QUAD.replace("f 1/1/1 3/3/3 4/4/4", "f 1/1/1 2/2/2 3/3/3 4/4/4");
        let arena = RenderArena::with_capacity(1 << 12);
        let err = parse_obj::<Mesh>(&text, &arena).unwrap_err();
        assert!(matches!(err, RasterError::MalformedInput(ref m) if m.contains("line 16")));
    }

    #[test]
    fn test_index_out_of_range() {
        let text = QUAD.replace("f 1/1/1 3/3/3 4/4/4", "f 1/1/1 3/3/3 5/4/4");
        let arena = RenderArena::with_capacity(1 << 12);
        assert!(matches!(
            parse_obj::<Mesh>(&text, &arena),
            Err(RasterError::MalformedInput(_))
        ));
        let zero = QUAD.replace("f 1/1/1 3/3/3 4/4/4", "f 0/1/1 3/3/3 4/4/4");
        assert!(parse_obj::<Mesh>(&zero, &arena).is_err());
    }

    #[test]
    fn test_missing_uv_slot_is_rejected() {
        let text = QUAD.replace("f 1/1/1 3/3/3 4/4/4", "f 1//1 3//3 4//4");
        let arena = RenderArena::with_capacity(1 << 12);
        assert!(matches!(
            parse_obj::<Mesh>(&text, &arena),
            Err(RasterError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_bad_number_names_line() {
        let text = QUAD.replace("v 1 1 0", "v 1 one 0");
        let arena = RenderArena::with_capacity(1 << 12);
        let err = parse_obj::<Mesh>(&text, &arena).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{}", err);
    }

    #[test]
    fn test_normal_count_mismatch_is_invalid() {
        let text = QUAD.replacen("vn 0 0 1\n", "", 1);
        let arena = RenderArena::with_capacity(1 << 12);
        assert!(matches!(
            parse_obj::<Mesh>(&text, &arena),
            Err(RasterError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_arena_budget_applies() {
        let arena = RenderArena::with_capacity(64);
        assert!(matches!(
            parse_obj::<Mesh>(QUAD, &arena),
            Err(RasterError::ResourceExhausted { .. })
        ));
    }
}
