//! Pinhole camera
//!
//! All derived viewport state is a pure function of `CameraParams` and is
//! recomputed in full by `new` and `reconfigure`; there is no partial update.

use serde::{Deserialize, Serialize};

use super::math::{degrees_to_radians, Point3, Vec2i, Vec3};

/// Below this, a point is treated as lying in (or behind) the eye plane.
const MIN_VIEW_DOT: f32 = 1e-6;

/// Camera inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    pub image_width: u32,
    pub image_height: u32,
    pub image_channels: u32,
    /// Vertical field of view in degrees
    pub vfov: f32,
    pub look_from: Point3,
    pub look_at: Point3,
    pub vup: Vec3,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            image_width: 400,
            image_height: 400,
            image_channels: 4,
            vfov: 20.0,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::UP,
        }
    }
}

/// A world point mapped to pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub pixel: Vec2i,
    /// Signed camera-space depth; larger is nearer the eye
    pub depth: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    params: CameraParams,

    // Derived state
    view_dir: Vec3,
    focal_length: f32,
    viewport_width: f32,
    viewport_height: f32,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    viewport_upper_left: Vec3,
    pixel00_loc: Point3,
}

impl Camera {
    pub fn new(params: CameraParams) -> Self {
        let mut cam = Self {
            params,
            view_dir: Vec3::ZERO,
            focal_length: 0.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
            u: Vec3::ZERO,
            v: Vec3::ZERO,
            w: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            viewport_upper_left: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
        };
        cam.initialize();
        cam
    }

    /// Replace the inputs and rebuild every derived field
    pub fn reconfigure(&mut self, params: CameraParams) {
        self.params = params;
        self.initialize();
    }

    fn initialize(&mut self) {
        let p = self.params;

        self.view_dir = p.look_at - p.look_from;
        self.focal_length = self.view_dir.len();

        let h = (degrees_to_radians(p.vfov) / 2.0).tan();
        self.viewport_height = 2.0 * h * self.focal_length;
        self.viewport_width = self.viewport_height * (p.image_width as f32 / p.image_height as f32);

        self.w = (p.look_from - p.look_at).normalize();
        self.u = p.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        // Screen rows grow downward while v points up
        let viewport_u = self.u * self.viewport_width;
        let viewport_v = self.v * -self.viewport_height;

        self.pixel_delta_u = viewport_u / p.image_width as f32;
        self.pixel_delta_v = viewport_v / p.image_height as f32;

        self.viewport_upper_left = self.view_dir - (viewport_u / 2.0 + viewport_v / 2.0);
        self.pixel00_loc =
            p.look_from + self.viewport_upper_left + (self.pixel_delta_u + self.pixel_delta_v) * 0.5;
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn image_width(&self) -> u32 {
        self.params.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.params.image_height
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn view_dir(&self) -> Vec3 {
        self.view_dir
    }

    /// Orthonormal basis (u right, v up, w backward)
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }

    pub fn viewport_size(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn pixel_deltas(&self) -> (Vec3, Vec3) {
        (self.pixel_delta_u, self.pixel_delta_v)
    }

    /// Upper-left viewport corner relative to the eye
    pub fn viewport_upper_left(&self) -> Vec3 {
        self.viewport_upper_left
    }

    /// World-space center of pixel (0, 0)
    pub fn pixel00_loc(&self) -> Point3 {
        self.pixel00_loc
    }

    /// Project a world point through the viewport plane at the look-at
    /// distance.
    ///
    /// Returns `None` for points in or behind the eye plane, where the
    /// projective scale flips sign or blows up.
    pub fn project(&self, p: Point3) -> Option<Projected> {
        let rel = p - self.params.look_from;
        let along = self.view_dir.dot(rel);
        if along <= MIN_VIEW_DOT {
            return None;
        }

        let on_plane = rel * (self.focal_length * self.focal_length / along) - self.viewport_upper_left;
        let px = on_plane.dot(self.pixel_delta_u) / self.pixel_delta_u.len_squared();
        let py = on_plane.dot(self.pixel_delta_v) / self.pixel_delta_v.len_squared();
        if !px.is_finite() || !py.is_finite() {
            return None;
        }

        Some(Projected {
            // `as` truncates toward zero and saturates out-of-range values
            pixel: Vec2i::new(px as i32, py as i32),
            depth: self.w.dot(rel),
        })
    }
}
