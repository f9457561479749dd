/// Benchmark suite for the mesh transform pipelines and the rasterizer
/// Compares the scalar AoS pipeline against the 4-wide SoA pipeline
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use soft_rasterizer::mesh::{
    primitives, Mesh, MeshCounts, MeshSoa, MeshStorage, MeshTransform, Placement, RenderArena, TriangleSoup,
};
use soft_rasterizer::rasterizer::{
    rasterize_mesh, rasterize_triangles, Camera, CameraParams, Color, RasterSettings, Texture, Vec3,
};

fn placement() -> Placement {
    Placement {
        position: Vec3::new(0.0, 0.0, -4.0),
        rotation: Vec3::new(10.0, 25.0, -5.0),
        height: 2.0,
    }
}

fn point_cloud(arena: &RenderArena, n: usize) -> Mesh<'_> {
    let counts = MeshCounts {
        vertices: n,
        uvs: 0,
        normals: n,
        faces: 0,
    };
    let mut mesh = Mesh::alloc(arena, counts).expect("arena sized for the cloud");
    for i in 0..n {
        let t = i as f32 * 0.01;
        mesh.set_vertex(i, Vec3::new(t.sin(), t.cos() * 2.0, (t * 3.0).sin()));
        mesh.set_normal(i, Vec3::new(t.cos(), 0.0, t.sin()));
    }
    mesh
}

fn bench_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("place");

    for size in [1_000usize, 10_000, 100_000].iter() {
        let arena = RenderArena::with_capacity(size * 64);
        let mut aos = point_cloud(&arena, *size);
        let mut soa = MeshSoa::from_mesh(&arena, &aos).expect("arena sized for the cloud");

        group.bench_with_input(BenchmarkId::new("scalar", size), size, |b, _| {
            b.iter(|| aos.place(black_box(placement())).expect("non-degenerate"));
        });
        group.bench_with_input(BenchmarkId::new("simd", size), size, |b, _| {
            b.iter(|| soa.place(black_box(placement())).expect("non-degenerate"));
        });
    }

    group.finish();
}

fn camera() -> Camera {
    Camera::new(CameraParams {
        image_width: 320,
        image_height: 240,
        image_channels: 4,
        vfov: 60.0,
        ..CameraParams::default()
    })
}

fn bench_rasterize_cube(c: &mut Criterion) {
    let camera = camera();
    let settings = RasterSettings {
        light_dir: Vec3::new(-0.3, -0.4, -0.866),
    };
    let mut triangles = primitives::cube_triangles(1.0);
    TriangleSoup::from_triangles(&mut triangles)
        .place(placement())
        .expect("cube is not flat");

    c.bench_function("rasterize_flat_cube", |b| {
        let mut arena = RenderArena::with_capacity(1 << 20);
        b.iter(|| {
            arena.reset();
            let mut fb = arena.alloc_framebuffer(320, 240, 4).expect("arena sized for target");
            black_box(rasterize_triangles(&mut fb, &camera, &settings, &triangles, Vec3::splat(200.0)))
        });
    });

    c.bench_function("rasterize_textured_cube", |b| {
        let mesh_arena = RenderArena::with_capacity(1 << 12);
        let mut mesh = primitives::cube_mesh(&mesh_arena, 1.0).expect("arena sized for cube");
        mesh.place(placement()).expect("cube is not flat");
        let texture = Texture::checkerboard(64, 64, Color::WHITE, Color::new(60, 60, 60)).expect("non-empty texture");

        let mut arena = RenderArena::with_capacity(1 << 20);
        b.iter(|| {
            arena.reset();
            let mut fb = arena.alloc_framebuffer(320, 240, 4).expect("arena sized for target");
            black_box(rasterize_mesh(&mut fb, &camera, &settings, &mesh, &texture))
        });
    });
}

criterion_group!(benches, bench_place, bench_rasterize_cube);
criterion_main!(benches);
