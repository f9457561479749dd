//! CPU triangle rasterizer
//!
//! Features:
//! - Pinhole camera with explicit, fully recomputed viewport state
//! - Flat-shaded triangle lists and smooth-shaded, textured meshes
//! - Depth buffer shared across passes so several meshes composite
//! - 4-wide lane kernel for the mesh transform pipeline

mod camera;
mod math;
mod render;
pub mod simd;
mod types;

pub use camera::*;
pub use math::*;
pub use render::*;
pub use types::*;
