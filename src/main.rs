//! soft-rasterizer - render a RON scene description to an image file
//!
//! Usage: soft-rasterizer <scene.ron> [--output <image>]

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;

use soft_rasterizer::config::{self, MeshLayout, ModelConfig, ModelSource, SceneConfig};
use soft_rasterizer::mesh::{
    obj, primitives, stl, Mesh, MeshSoa, MeshTransform, RenderArena, TriangleSoup, TriangleSource,
};
use soft_rasterizer::rasterizer::{
    rasterize_mesh, rasterize_triangles, Camera, Framebuffer, RasterSettings, RasterStats, Texture, Vec3,
};

struct Args {
    scene: PathBuf,
    output: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();
    let mut scene = None;
    let mut output = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" if i + 1 < args.len() => {
                output = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            other if scene.is_none() && !other.starts_with('-') => {
                scene = Some(PathBuf::from(other));
                i += 1;
            }
            other => bail!("unexpected argument {:?}", other),
        }
    }
    let Some(scene) = scene else {
        bail!("usage: soft-rasterizer <scene.ron> [--output <image>]");
    };
    Ok(Args { scene, output })
}

fn place_and_draw<M: MeshTransform + TriangleSource>(
    mut mesh: M,
    model: &ModelConfig,
    fb: &mut Framebuffer,
    camera: &Camera,
    settings: &RasterSettings,
    texture: &Texture,
) -> anyhow::Result<RasterStats> {
    mesh.place(model.placement).context("placing mesh")?;
    Ok(rasterize_mesh(fb, camera, settings, &mesh, texture))
}

fn draw_soup(
    mut soup: TriangleSoup,
    model: &ModelConfig,
    fb: &mut Framebuffer,
    camera: &Camera,
    settings: &RasterSettings,
    color: Vec3,
) -> anyhow::Result<RasterStats> {
    soup.place(model.placement).context("placing triangles")?;
    Ok(rasterize_triangles(fb, camera, settings, soup.triangles(), color))
}

fn render_model(
    model: &ModelConfig,
    arena: &RenderArena,
    fb: &mut Framebuffer,
    camera: &Camera,
    settings: &RasterSettings,
) -> anyhow::Result<RasterStats> {
    match &model.source {
        ModelSource::Obj { path, texture } => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let texture =
                Texture::from_file(texture).with_context(|| format!("loading texture {}", texture.display()))?;
            match model.layout {
                MeshLayout::Aos => {
                    let mesh: Mesh = obj::parse_obj(&text, arena).with_context(|| format!("parsing {}", path.display()))?;
                    place_and_draw(mesh, model, fb, camera, settings, &texture)
                }
                MeshLayout::Soa => {
                    let mesh: MeshSoa =
                        obj::parse_obj(&text, arena).with_context(|| format!("parsing {}", path.display()))?;
                    place_and_draw(mesh, model, fb, camera, settings, &texture)
                }
            }
        }
        ModelSource::Stl { path, color } => {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let soup = stl::parse_stl(&bytes, arena).with_context(|| format!("parsing {}", path.display()))?;
            draw_soup(soup, model, fb, camera, settings, *color)
        }
        ModelSource::Cube { size, color } => {
            let mut triangles = primitives::cube_triangles(*size);
            draw_soup(TriangleSoup::from_triangles(&mut triangles), model, fb, camera, settings, *color)
        }
    }
}

fn save(fb: &Framebuffer, path: &std::path::Path) -> anyhow::Result<()> {
    let color_type = match fb.channels() {
        1 => image::ColorType::L8,
        2 => image::ColorType::La8,
        3 => image::ColorType::Rgb8,
        _ => image::ColorType::Rgba8,
    };
    image::save_buffer(path, fb.color(), fb.width() as u32, fb.height() as u32, color_type)
        .with_context(|| format!("writing {}", path.display()))
}

fn render(scene: &SceneConfig) -> anyhow::Result<RasterStats> {
    let arena = RenderArena::with_capacity(scene.arena_bytes);
    let params = scene.camera;
    let mut fb = arena
        .alloc_framebuffer(
            params.image_width as usize,
            params.image_height as usize,
            params.image_channels as usize,
        )
        .context("allocating framebuffer")?;
    fb.clear(scene.clear_color);

    let camera = Camera::new(params);
    let mut total = RasterStats::default();
    for (i, model) in scene.models.iter().enumerate() {
        total += render_model(model, &arena, &mut fb, &camera, &scene.settings)
            .with_context(|| format!("model {}", i))?;
    }

    save(&fb, &scene.output)?;
    info!(
        arena_used = arena.used(),
        arena_capacity = arena.capacity(),
        "render pass finished"
    );
    Ok(total)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args()?;
    let mut scene = config::load_scene(&args.scene)
        .with_context(|| format!("loading scene {}", args.scene.display()))?;
    if let Some(output) = args.output {
        scene.output = output;
    }
    info!(
        scene = %args.scene.display(),
        models = scene.models.len(),
        width = scene.camera.image_width,
        height = scene.camera.image_height,
        "Rendering"
    );

    let stats = render(&scene)?;
    info!(
        output = %scene.output.display(),
        triangles = stats.triangles_drawn,
        pixels = stats.pixels_written,
        "Wrote image"
    );
    Ok(())
}
