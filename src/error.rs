//! Error type shared by the loaders, the arena and the transform pipeline.
//!
//! The rasterizer itself never fails: bad triangles and texels are skipped
//! and counted in `RasterStats` instead.

/// Errors emitted.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    /// The render arena cannot satisfy an allocation.
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    ResourceExhausted { requested: usize, remaining: usize },

    /// Degenerate geometry that the transform pipeline refuses to scale.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Texture or buffer coordinate outside its valid range.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// A loader was handed inconsistent counts, records or indices.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("config serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;
