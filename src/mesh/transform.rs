//! Scalar mesh transform pipeline
//!
//! center -> scale -> rotate -> translate for positions, rotate only for
//! normals. The scale factor maps the untransformed vertical extent onto the
//! target height.

use tracing::trace;

use super::{check_normal_count, Mesh, Placement, TriangleSoup};
use crate::error::{RasterError, Result};
use crate::rasterizer::{Mat3, Vec3};

/// Placement operations shared by both mesh layouts
pub trait MeshTransform {
    fn placement(&self) -> Placement;

    fn placement_mut(&mut self) -> &mut Placement;

    /// Run the full pipeline with `placement` and store it on success.
    ///
    /// Fails with `InvalidMesh` for an empty mesh, a zero vertical extent,
    /// or a vertex/normal count mismatch. The mesh is untouched on failure.
    fn place(&mut self, placement: Placement) -> Result<()>;

    /// Re-run the pipeline with the stored placement
    fn apply_placement(&mut self) -> Result<()> {
        let placement = self.placement();
        self.place(placement)
    }

    /// Translate every vertex and the stored position
    fn shift_by(&mut self, delta: Vec3);

    /// Rotate vertices and normals about the stored position, accumulating
    /// `delta` degrees into the stored rotation
    fn rotate_by(&mut self, delta: Vec3);

    fn set_position(&mut self, position: Vec3) {
        self.placement_mut().position = position;
    }

    fn set_rotation(&mut self, rotation: Vec3) {
        self.placement_mut().rotation = rotation;
    }

    fn set_height(&mut self, height: f32) {
        self.placement_mut().height = height;
    }
}

/// Roll, pitch and yaw matrices applied one after another, X then Y then Z
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerRotation {
    pub roll: Mat3,
    pub pitch: Mat3,
    pub yaw: Mat3,
}

impl EulerRotation {
    pub fn from_degrees(angles: Vec3) -> Self {
        Self {
            roll: Mat3::roll(angles.x),
            pitch: Mat3::pitch(angles.y),
            yaw: Mat3::yaw(angles.z),
        }
    }

    #[inline]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        self.yaw * (self.pitch * (self.roll * v))
    }
}

/// Centroid and uniform scale derived from the untransformed vertices
#[derive(Debug, Clone, Copy)]
pub(super) struct Fit {
    pub centroid: Vec3,
    pub scale: f32,
}

impl Fit {
    pub fn new(sum: Vec3, count: usize, min_y: f32, max_y: f32, height: f32) -> Result<Self> {
        if count == 0 {
            return Err(RasterError::InvalidMesh("mesh has no vertices".into()));
        }
        let extent = max_y - min_y;
        if !(extent > 0.0) || !extent.is_finite() {
            return Err(RasterError::InvalidMesh(format!(
                "vertical extent {} cannot be scaled to height {}",
                extent, height
            )));
        }
        let scale = height / extent;
        if !scale.is_finite() {
            return Err(RasterError::InvalidMesh(format!("scale factor {} is not finite", scale)));
        }
        Ok(Self {
            centroid: sum / count as f32,
            scale,
        })
    }

    pub fn scan(vertices: impl IntoIterator<Item = Vec3>, height: f32) -> Result<Self> {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for v in vertices {
            sum += v;
            count += 1;
            min_y = min_y.min(v.y);
            max_y = max_y.max(v.y);
        }
        Self::new(sum, count, min_y, max_y, height)
    }

    #[inline]
    pub fn apply(&self, rotation: &EulerRotation, position: Vec3, v: Vec3) -> Vec3 {
        rotation.apply((v - self.centroid) * self.scale) + position
    }
}

impl MeshTransform for Mesh<'_> {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    fn place(&mut self, placement: Placement) -> Result<()> {
        check_normal_count(self.counts())?;
        let fit = Fit::scan(self.vertices.iter().copied(), placement.height)?;
        let rotation = EulerRotation::from_degrees(placement.rotation);
        trace!(
            centroid = ?fit.centroid,
            scale = fit.scale,
            vertices = self.vertices.len(),
            "placing mesh"
        );

        for v in self.vertices.iter_mut() {
            *v = fit.apply(&rotation, placement.position, *v);
        }
        for n in self.normals.iter_mut() {
            *n = rotation.apply(*n);
        }
        self.placement = placement;
        Ok(())
    }

    fn shift_by(&mut self, delta: Vec3) {
        for v in self.vertices.iter_mut() {
            *v += delta;
        }
        self.placement.position += delta;
    }

    fn rotate_by(&mut self, delta: Vec3) {
        let rotation = EulerRotation::from_degrees(delta);
        let pivot = self.placement.position;
        for v in self.vertices.iter_mut() {
            *v = rotation.apply(*v - pivot) + pivot;
        }
        for n in self.normals.iter_mut() {
            *n = rotation.apply(*n);
        }
        self.placement.rotation += delta;
    }
}

impl TriangleSoup<'_> {
    /// Fit and place a flat triangle list.
    ///
    /// The centroid is the mean over all three vertices of every face,
    /// shared corners counted once per face. Face normals are rotated only.
    pub fn place(&mut self, placement: Placement) -> Result<()> {
        let fit = Fit::scan(
            self.triangles().iter().flat_map(|t| t.vertices()),
            placement.height,
        )?;
        let rotation = EulerRotation::from_degrees(placement.rotation);
        trace!(
            centroid = ?fit.centroid,
            scale = fit.scale,
            faces = self.len(),
            "placing triangle soup"
        );

        for t in self.triangles_mut() {
            t.n = rotation.apply(t.n);
            t.v1 = fit.apply(&rotation, placement.position, t.v1);
            t.v2 = fit.apply(&rotation, placement.position, t.v2);
            t.v3 = fit.apply(&rotation, placement.position, t.v3);
        }
        Ok(())
    }
}
