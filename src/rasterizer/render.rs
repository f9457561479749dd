//! Core rendering functions
//!
//! Triangle rasterization with barycentric fill, a keep-the-largest depth
//! test and single directional-light shading.

use std::ops::AddAssign;

use tracing::{debug, warn};

use super::camera::{Camera, Projected};
use super::math::{barycentric, Interval, Vec2, Vec2i, Vec3};
use super::types::{Color, RasterSettings, Texture, Triangle};
use crate::error::{RasterError, Result};
use crate::mesh::TriangleSource;

/// Interpolated UVs this close outside [0, 1] are rounding noise, not bad data.
const UV_SLACK: f32 = 1e-4;

/// Caller-owned color and depth planes, row-major.
///
/// Depth holds the signed camera-space depth of the nearest surface seen so
/// far (larger is nearer) and starts at negative infinity. Keeping the same
/// framebuffer across calls composites several meshes.
pub struct Framebuffer<'a> {
    color: &'a mut [u8],
    depth: &'a mut [f32],
    width: usize,
    height: usize,
    channels: usize,
}

impl<'a> Framebuffer<'a> {
    pub fn new(
        color: &'a mut [u8],
        depth: &'a mut [f32],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self> {
        if !(1..=4).contains(&channels) {
            return Err(RasterError::MalformedInput(format!(
                "framebuffer needs 1-4 channels, got {}",
                channels
            )));
        }
        if color.len() != width * height * channels || depth.len() != width * height {
            return Err(RasterError::OutOfBounds(format!(
                "buffers of {} color bytes and {} depth cells do not fit {}x{}x{}",
                color.len(),
                depth.len(),
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            color,
            depth,
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn color(&self) -> &[u8] {
        &*self.color
    }

    pub fn depth(&self) -> &[f32] {
        &*self.depth
    }

    /// Fill every pixel with `color` and reset depth
    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.color.chunks_exact_mut(self.channels) {
            px.copy_from_slice(&bytes[..self.channels]);
        }
        self.clear_depth();
    }

    pub fn clear_depth(&mut self) {
        self.depth.fill(f32::NEG_INFINITY);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<&[u8]> {
        let idx = self.index(x, y)? * self.channels;
        Some(&self.color[idx..idx + self.channels])
    }

    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|idx| self.depth[idx])
    }

    /// Cell index if `z` would survive the depth test at (x, y).
    ///
    /// Ties pass, so the later of two equal-depth writes wins the color.
    fn depth_test(&self, x: i32, y: i32, z: f32) -> Option<usize> {
        let idx = self.index(x, y)?;
        if self.depth[idx] > z {
            return None;
        }
        Some(idx)
    }

    fn write(&mut self, idx: usize, z: f32, color: Color) {
        self.depth[idx] = z;
        let offset = idx * self.channels;
        self.color[offset..offset + self.channels].copy_from_slice(&color.to_bytes()[..self.channels]);
    }

    pub fn set_pixel_with_depth(&mut self, x: i32, y: i32, z: f32, color: Color) -> bool {
        match self.depth_test(x, y, z) {
            Some(idx) => {
                self.write(idx, z, color);
                true
            }
            None => false,
        }
    }
}

/// Counters from one rasterize call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles_drawn: usize,
    /// Facing away from the light
    pub triangles_unlit: usize,
    /// A vertex sits in or behind the eye plane
    pub triangles_clipped: usize,
    /// Face indices outside the mesh arrays
    pub triangles_malformed: usize,
    pub pixels_written: usize,
    /// Covered pixels dropped because their texel lookup failed
    pub pixels_skipped: usize,
}

impl AddAssign for RasterStats {
    fn add_assign(&mut self, o: RasterStats) {
        self.triangles_drawn += o.triangles_drawn;
        self.triangles_unlit += o.triangles_unlit;
        self.triangles_clipped += o.triangles_clipped;
        self.triangles_malformed += o.triangles_malformed;
        self.pixels_written += o.pixels_written;
        self.pixels_skipped += o.pixels_skipped;
    }
}

fn project_triangle(camera: &Camera, vertices: [Vec3; 3]) -> Option<[Projected; 3]> {
    Some([
        camera.project(vertices[0])?,
        camera.project(vertices[1])?,
        camera.project(vertices[2])?,
    ])
}

/// Screen-space bounding box clamped to a `width` x `height` target,
/// inclusive. `None` if the triangle lies entirely off screen.
fn screen_bounds(width: usize, height: usize, p: &[Projected; 3]) -> Option<(Vec2i, Vec2i)> {
    let xs = [p[0].pixel.x, p[1].pixel.x, p[2].pixel.x];
    let ys = [p[0].pixel.y, p[1].pixel.y, p[2].pixel.y];

    let lo = Vec2i::new(
        xs.iter().copied().min()?.max(0),
        ys.iter().copied().min()?.max(0),
    );
    let hi = Vec2i::new(
        xs.iter().copied().max()?.min(width as i32 - 1),
        ys.iter().copied().max()?.min(height as i32 - 1),
    );
    if lo.x > hi.x || lo.y > hi.y {
        return None;
    }
    Some((lo, hi))
}

/// Visit every pixel of the box inside the projected triangle, with its
/// barycentric weights
fn for_each_covered(
    (lo, hi): (Vec2i, Vec2i),
    p: &[Projected; 3],
    mut visit: impl FnMut(Vec2i, Vec3),
) {
    for y in lo.y..=hi.y {
        for x in lo.x..=hi.x {
            let pixel = Vec2i::new(x, y);
            let bc = barycentric(p[0].pixel, p[1].pixel, p[2].pixel, pixel);
            if bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0 {
                continue;
            }
            visit(pixel, bc);
        }
    }
}

fn interpolate_depth(p: &[Projected; 3], bc: Vec3) -> f32 {
    p[0].depth * bc.x + p[1].depth * bc.y + p[2].depth * bc.z
}

fn interpolate_uv(uvs: &[Vec2; 3], bc: Vec3) -> Vec2 {
    let uv = uvs[0] * bc.x + uvs[1] * bc.y + uvs[2] * bc.z;
    let snap = |c: f32| {
        if Interval::new(-UV_SLACK, 1.0 + UV_SLACK).contains(c) {
            Interval::UNIT.clamp(c)
        } else {
            c
        }
    };
    Vec2::new(snap(uv.x), snap(uv.y))
}

fn log_stats(what: &str, stats: &RasterStats) {
    debug!(
        drawn = stats.triangles_drawn,
        unlit = stats.triangles_unlit,
        clipped = stats.triangles_clipped,
        pixels = stats.pixels_written,
        "rasterized {}",
        what
    );
    if stats.triangles_malformed > 0 || stats.pixels_skipped > 0 {
        warn!(
            malformed = stats.triangles_malformed,
            skipped_pixels = stats.pixels_skipped,
            "rasterizer skipped bad {} data",
            what
        );
    }
}

/// Rasterize flat-shaded triangles in a single color (0-255 RGB floats).
///
/// Each triangle is lit once from its face normal; triangles facing away
/// from the light are culled before projection.
pub fn rasterize_triangles(
    fb: &mut Framebuffer,
    camera: &Camera,
    settings: &RasterSettings,
    triangles: &[Triangle],
    color: Vec3,
) -> RasterStats {
    let mut stats = RasterStats::default();

    for t in triangles {
        let intensity = -settings.light_dir.dot(t.n);
        // NaN normals fail this too
        if !(intensity > 0.0) {
            stats.triangles_unlit += 1;
            continue;
        }
        let Some(projected) = project_triangle(camera, t.vertices()) else {
            stats.triangles_clipped += 1;
            continue;
        };
        stats.triangles_drawn += 1;

        let Some(bounds) = screen_bounds(fb.width, fb.height, &projected) else {
            continue;
        };
        let shaded = Color::from_shaded(color * intensity);
        for_each_covered(bounds, &projected, |pixel, bc| {
            let z = interpolate_depth(&projected, bc);
            if fb.set_pixel_with_depth(pixel.x, pixel.y, z, shaded) {
                stats.pixels_written += 1;
            }
        });
    }

    log_stats("flat triangles", &stats);
    stats
}

/// Rasterize a smooth-shaded, textured mesh.
///
/// Normals and UVs are interpolated per pixel; the light is evaluated per
/// pixel and texels are fetched nearest-neighbor. Faces with bad indices and
/// pixels whose texel lookup fails are skipped and counted.
pub fn rasterize_mesh<S: TriangleSource + ?Sized>(
    fb: &mut Framebuffer,
    camera: &Camera,
    settings: &RasterSettings,
    mesh: &S,
    texture: &Texture,
) -> RasterStats {
    let mut stats = RasterStats::default();

    for k in 0..mesh.face_count() {
        let Some(t) = mesh.triangle(k) else {
            stats.triangles_malformed += 1;
            continue;
        };
        let Some(projected) = project_triangle(camera, t.vertices) else {
            stats.triangles_clipped += 1;
            continue;
        };
        stats.triangles_drawn += 1;

        let Some(bounds) = screen_bounds(fb.width, fb.height, &projected) else {
            continue;
        };
        for_each_covered(bounds, &projected, |pixel, bc| {
            let z = interpolate_depth(&projected, bc);

            let n = t.normals[0] * bc.x + t.normals[1] * bc.y + t.normals[2] * bc.z;
            let intensity = -settings.light_dir.dot(n);
            if intensity < 0.0 {
                return;
            }

            let Some(idx) = fb.depth_test(pixel.x, pixel.y, z) else {
                return;
            };

            let uv = interpolate_uv(&t.uvs, bc);
            let rgb = match texture.sample(uv.x, uv.y) {
                Ok(rgb) => rgb,
                Err(_) => {
                    stats.pixels_skipped += 1;
                    return;
                }
            };
            let lit = Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) * intensity;
            fb.write(idx, z, Color::from_shaded(lit));
            stats.pixels_written += 1;
        });
    }

    log_stats("textured mesh", &stats);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{CameraParams, ObjTriangle};

    const SIZE: usize = 64;

    fn camera() -> Camera {
        Camera::new(CameraParams {
            image_width: SIZE as u32,
            image_height: SIZE as u32,
            image_channels: 4,
            vfov: 90.0,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::UP,
        })
    }

    /// Triangle facing +Z whose footprint is the same for every `z`
    fn facing(z: f32) -> Triangle {
        let s = -z;
        Triangle::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(-0.5 * s, -0.5 * s, z),
            Vec3::new(0.5 * s, -0.5 * s, z),
            Vec3::new(0.0, 0.5 * s, z),
        )
    }

    fn buffers() -> (Vec<u8>, Vec<f32>) {
        (vec![0; SIZE * SIZE * 4], vec![f32::NEG_INFINITY; SIZE * SIZE])
    }

    #[test]
    fn test_flat_triangle_fills_and_leaves_background() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let stats = rasterize_triangles(
            &mut fb,
            &camera(),
            &RasterSettings::default(),
            &[facing(-1.0)],
            Vec3::new(255.0, 128.0, 0.0),
        );
        assert_eq!(stats.triangles_drawn, 1);
        assert!(stats.pixels_written > 0);
        assert_eq!(fb.pixel(32, 40).unwrap(), &[255, 128, 0, 255]);
        assert!((fb.depth_at(32, 40).unwrap() - -1.0).abs() < 1e-5);
        assert_eq!(fb.pixel(0, 0).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(fb.depth_at(0, 0).unwrap(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_unlit_triangle_is_culled() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let mut back = facing(-1.0);
        back.n = Vec3::new(0.0, 0.0, -1.0);
        let stats = rasterize_triangles(&mut fb, &camera(), &RasterSettings::default(), &[back], Vec3::splat(255.0));
        assert_eq!(stats.triangles_unlit, 1);
        assert_eq!(stats.pixels_written, 0);
        assert!(fb.color().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_triangle_behind_eye_is_skipped() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let mut behind = facing(-1.0);
        behind.v3.z = 1.0;
        let stats = rasterize_triangles(&mut fb, &camera(), &RasterSettings::default(), &[behind], Vec3::splat(255.0));
        assert_eq!(stats.triangles_clipped, 1);
        assert!(fb.depth().iter().all(|d| *d == f32::NEG_INFINITY));
    }

    #[test]
    fn test_depth_is_order_independent() {
        let near = facing(-1.0);
        let far = facing(-2.0);
        let settings = RasterSettings::default();
        let cam = camera();

        let (mut color_a, mut depth_a) = buffers();
        let mut fb = Framebuffer::new(&mut color_a, &mut depth_a, SIZE, SIZE, 4).unwrap();
        rasterize_triangles(&mut fb, &cam, &settings, &[near], Vec3::new(255.0, 0.0, 0.0));
        rasterize_triangles(&mut fb, &cam, &settings, &[far], Vec3::new(0.0, 0.0, 255.0));
        assert!((fb.depth_at(32, 40).unwrap() - -1.0).abs() < 1e-5);

        let (mut color_b, mut depth_b) = buffers();
        let mut fb = Framebuffer::new(&mut color_b, &mut depth_b, SIZE, SIZE, 4).unwrap();
        rasterize_triangles(&mut fb, &cam, &settings, &[far], Vec3::new(0.0, 0.0, 255.0));
        rasterize_triangles(&mut fb, &cam, &settings, &[near], Vec3::new(255.0, 0.0, 0.0));

        assert_eq!(depth_a, depth_b);
        assert_eq!(color_a, color_b);
        assert_eq!(&color_a[(40 * SIZE + 32) * 4..(40 * SIZE + 32) * 4 + 4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_textured_mesh_modulates_texel() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let flat = facing(-1.0);
        let tri = ObjTriangle {
            normals: [Vec3::new(0.0, 0.0, 0.5); 3],
            vertices: flat.vertices(),
            uvs: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.5, 1.0)],
        };
        let texture = Texture::new(2, 2, 3, [200u8, 100, 50].repeat(4)).unwrap();

        let stats = rasterize_mesh(&mut fb, &camera(), &RasterSettings::default(), &[tri][..], &texture);
        assert_eq!(stats.pixels_skipped, 0);
        assert!(stats.pixels_written > 0);
        assert_eq!(fb.pixel(32, 40).unwrap(), &[100, 50, 25, 255]);
    }

    #[test]
    fn test_textured_out_of_range_uv_skips_pixels() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let tri = ObjTriangle {
            normals: [Vec3::new(0.0, 0.0, 1.0); 3],
            vertices: facing(-1.0).vertices(),
            uvs: [Vec2::new(2.0, 2.0); 3],
        };
        let texture = Texture::new(2, 2, 3, vec![255; 12]).unwrap();

        let stats = rasterize_mesh(&mut fb, &camera(), &RasterSettings::default(), &[tri][..], &texture);
        assert_eq!(stats.pixels_written, 0);
        assert!(stats.pixels_skipped > 0);
        assert!(fb.depth().iter().all(|d| *d == f32::NEG_INFINITY));
    }

    #[test]
    fn test_huge_offscreen_triangle_is_clamped() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        // base vertices hug the eye plane and project far past both edges
        let wide = Triangle::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(-1e4, -0.5, -1e-4),
            Vec3::new(1e4, -0.5, -1e-4),
            Vec3::new(0.0, 0.5, -1.0),
        );
        let stats = rasterize_triangles(
            &mut fb,
            &camera(),
            &RasterSettings::default(),
            &[wide],
            Vec3::new(255.0, 0.0, 0.0),
        );
        assert_eq!(stats.triangles_drawn, 1);
        assert!(stats.pixels_written > 0);
        assert_eq!(fb.pixel(32, 50).unwrap(), &[255, 0, 0, 255]);
        assert_eq!(fb.pixel(32, 5).unwrap(), &[0, 0, 0, 0]);
    }

    fn textured(normals: [Vec3; 3]) -> ObjTriangle {
        ObjTriangle {
            normals,
            vertices: facing(-1.0).vertices(),
            uvs: [Vec2::new(0.5, 0.5); 3],
        }
    }

    fn solid_texture() -> Texture {
        Texture::new(2, 2, 3, [200u8, 100, 50].repeat(4)).unwrap()
    }

    #[test]
    fn test_textured_normals_facing_away_write_nothing() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let tri = textured([Vec3::new(0.0, 0.0, -1.0); 3]);

        let stats = rasterize_mesh(&mut fb, &camera(), &RasterSettings::default(), &[tri][..], &solid_texture());
        assert_eq!(stats.triangles_drawn, 1);
        assert_eq!(stats.pixels_written, 0);
        assert_eq!(stats.pixels_skipped, 0);
        assert!(fb.color().iter().all(|&b| b == 0));
        assert!(fb.depth().iter().all(|d| *d == f32::NEG_INFINITY));
    }

    #[test]
    fn test_textured_mixed_normals_light_part_of_triangle() {
        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        // base corners face the light, the apex faces away; the lit
        // region is where the apex weight is at most one half
        let tri = textured([
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ]);
        let stats = rasterize_mesh(&mut fb, &camera(), &RasterSettings::default(), &[tri][..], &solid_texture());

        let (mut full_color, mut full_depth) = buffers();
        let mut full = Framebuffer::new(&mut full_color, &mut full_depth, SIZE, SIZE, 4).unwrap();
        let all_lit = rasterize_mesh(
            &mut full,
            &camera(),
            &RasterSettings::default(),
            &[textured([Vec3::new(0.0, 0.0, 1.0); 3])][..],
            &solid_texture(),
        );

        assert!(stats.pixels_written > 0);
        assert!(stats.pixels_written < all_lit.pixels_written);
        // near the base: lit but dimmer than the bare texel
        let base = fb.pixel(32, 44).unwrap();
        assert_eq!(base[3], 255);
        assert!(base[0] > 0 && base[0] < 200);
        // near the apex: skipped, depth untouched
        assert_eq!(fb.pixel(32, 22).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(fb.depth_at(32, 22).unwrap(), f32::NEG_INFINITY);
        assert!(full.depth_at(32, 22).unwrap() > f32::NEG_INFINITY);
    }

    #[test]
    fn test_grazing_light_textured_writes_black_flat_culls() {
        let grazing = Vec3::new(1.0, 0.0, 0.0);

        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let stats = rasterize_mesh(&mut fb, &camera(), &RasterSettings::default(), &[textured([grazing; 3])][..], &solid_texture());
        assert!(stats.pixels_written > 0);
        assert_eq!(fb.pixel(32, 40).unwrap(), &[0, 0, 0, 255]);
        assert!((fb.depth_at(32, 40).unwrap() - -1.0).abs() < 1e-5);

        let (mut color, mut depth) = buffers();
        let mut fb = Framebuffer::new(&mut color, &mut depth, SIZE, SIZE, 4).unwrap();
        let mut edge_on = facing(-1.0);
        edge_on.n = grazing;
        let stats = rasterize_triangles(&mut fb, &camera(), &RasterSettings::default(), &[edge_on], Vec3::splat(255.0));
        assert_eq!(stats.triangles_unlit, 1);
        assert_eq!(stats.pixels_written, 0);
    }

    #[test]
    fn test_framebuffer_rejects_mismatched_buffers() {
        let mut color = vec![0u8; 10];
        let mut depth = vec![0.0f32; 4];
        assert!(Framebuffer::new(&mut color, &mut depth, 2, 2, 4).is_err());
    }
}
