//! Binary STL loader
//!
//! 80-byte header, little-endian face count, then 50 bytes per face: normal
//! and three vertices as little-endian f32, plus a 2-byte attribute that is
//! ignored. Each triple is remapped to the renderer's axes as `(-x, z, y)`.

use tracing::debug;

use super::{RenderArena, TriangleSoup};
use crate::error::{RasterError, Result};

const HEADER_LEN: usize = 80;
const FACE_LEN: usize = 50;
const FLOATS_PER_FACE: usize = 12;

fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

pub fn parse_stl<'a>(bytes: &[u8], arena: &'a RenderArena) -> Result<TriangleSoup<'a>> {
    let count_bytes = bytes.get(HEADER_LEN..HEADER_LEN + 4).ok_or_else(|| {
        RasterError::MalformedInput(format!("stl is {} bytes, shorter than its header", bytes.len()))
    })?;
    let faces = u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]) as usize;

    let body = &bytes[HEADER_LEN + 4..];
    let expected = faces.checked_mul(FACE_LEN).unwrap_or(usize::MAX);
    if body.len() < expected {
        return Err(RasterError::MalformedInput(format!(
            "stl declares {} faces ({} bytes) but only {} bytes follow the header",
            faces,
            expected,
            body.len()
        )));
    }
    debug!(faces, "parsing binary stl");

    let floats = arena.alloc_slice(faces * FLOATS_PER_FACE, 0.0f32)?;
    for (record, out) in body
        .chunks_exact(FACE_LEN)
        .zip(floats.chunks_exact_mut(FLOATS_PER_FACE))
    {
        // normal, v1, v2, v3
        for (src, dst) in record[..48].chunks_exact(12).zip(out.chunks_exact_mut(3)) {
            dst[0] = -le_f32(&src[0..4]);
            dst[1] = le_f32(&src[8..12]);
            dst[2] = le_f32(&src[4..8]);
        }
    }
    TriangleSoup::from_floats(floats)
}

/// Read and parse a binary STL file
pub fn load_stl<'a>(path: impl AsRef<std::path::Path>, arena: &'a RenderArena) -> Result<TriangleSoup<'a>> {
    let bytes = std::fs::read(path)?;
    parse_stl(&bytes, arena)
}
