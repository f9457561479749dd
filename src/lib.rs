//! Software rasterizer: vector kernels, mesh loading and placement, a
//! pinhole camera, and flat or textured triangle fill with a depth buffer.

pub mod config;
pub mod error;
pub mod mesh;
pub mod rasterizer;

pub use error::{RasterError, Result};
