//! Scene files
//!
//! A scene is a RON document naming the output image, the camera, the light
//! and the models to composite. Relative model paths resolve against the
//! scene file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::mesh::Placement;
use crate::rasterizer::{CameraParams, Color, RasterSettings, Vec3};

/// Default render-pass arena budget (64 MiB)
pub const DEFAULT_ARENA_BYTES: usize = 64 << 20;

fn default_arena_bytes() -> usize {
    DEFAULT_ARENA_BYTES
}

fn default_clear_color() -> Color {
    Color::TRANSPARENT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Encoded image path; the format follows the extension
    pub output: PathBuf,
    /// Image size and channel count live here too
    pub camera: CameraParams,
    #[serde(default)]
    pub settings: RasterSettings,
    #[serde(default = "default_clear_color")]
    pub clear_color: Color,
    #[serde(default = "default_arena_bytes")]
    pub arena_bytes: usize,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub source: ModelSource,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub layout: MeshLayout,
}

/// Where a model's geometry comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSource {
    /// Textured OBJ mesh
    Obj { path: PathBuf, texture: PathBuf },
    /// Flat-shaded binary STL, color in 0-255 per channel
    Stl { path: PathBuf, color: Vec3 },
    /// Built-in flat-shaded cube
    Cube { size: f32, color: Vec3 },
}

/// Memory layout an OBJ mesh is loaded into, which picks the scalar or the
/// lane-parallel transform pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshLayout {
    #[default]
    Aos,
    Soa,
}

impl SceneConfig {
    pub fn validate(&self) -> Result<()> {
        let c = &self.camera;
        if c.image_width == 0 || c.image_height == 0 {
            return Err(RasterError::MalformedInput(format!(
                "image size {}x{} is empty",
                c.image_width, c.image_height
            )));
        }
        if !(1..=4).contains(&c.image_channels) {
            return Err(RasterError::MalformedInput(format!(
                "image must have 1 to 4 channels, got {}",
                c.image_channels
            )));
        }
        if c.look_from == c.look_at {
            return Err(RasterError::MalformedInput(
                "camera look_from and look_at coincide".into(),
            ));
        }
        Ok(())
    }

    /// Rebase relative paths onto `dir`
    fn resolve_paths(&mut self, dir: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        rebase(&mut self.output);
        for model in &mut self.models {
            match &mut model.source {
                ModelSource::Obj { path, texture } => {
                    rebase(path);
                    rebase(texture);
                }
                ModelSource::Stl { path, .. } => rebase(path),
                ModelSource::Cube { .. } => {}
            }
        }
    }
}

/// Load a scene from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut scene = load_scene_from_str(&contents)?;
    if let Some(dir) = path.parent() {
        scene.resolve_paths(dir);
    }
    Ok(scene)
}

/// Load a scene from a RON string, paths left as written
pub fn load_scene_from_str(s: &str) -> Result<SceneConfig> {
    let scene: SceneConfig = ron::from_str(s)?;
    scene.validate()?;
    Ok(scene)
}

/// Save a scene to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &SceneConfig, path: P) -> Result<()> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path, contents)?;
    Ok(())
}
