use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use prism_math::{Mat4, Vec3};
use prism_renderer::{
    Camera, Material, MeshData, Plane, RenderConfig, RenderMode, Renderer, Scene, Sky, Sphere, Surface, Terrain,
    Texture, ToneMapping,
};

/// Offline driver for the Prism kernel
#[derive(Debug, Parser)]
#[command(name = "prism", version, about)]
struct Args {
    /// JSON render configuration; flags below override its fields
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, short = 'm', value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, value_enum)]
    tone_mapping: Option<ToneArg>,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Progressive frames to accumulate
    #[arg(long, short = 'n', default_value_t = 64)]
    frames: u32,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = DemoScene::Spheres)]
    scene: DemoScene,

    /// Worker threads; all cores when omitted
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, short = 'o', default_value = "prism.png")]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Path,
    Caster,
    Tracer,
    Marcher,
    Ao,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Path => RenderMode::PathTracer,
            ModeArg::Caster => RenderMode::RayCaster,
            ModeArg::Tracer => RenderMode::RayTracer,
            ModeArg::Marcher => RenderMode::RayMarcher,
            ModeArg::Ao => RenderMode::AmbientOcclusion,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToneArg {
    Linear,
    Reinhard,
    ReinhardExtended,
    HejlDawson,
    Hable,
}

impl From<ToneArg> for ToneMapping {
    fn from(tone: ToneArg) -> Self {
        match tone {
            ToneArg::Linear => ToneMapping::Linear,
            ToneArg::Reinhard => ToneMapping::Reinhard,
            ToneArg::ReinhardExtended => ToneMapping::ReinhardExtended,
            ToneArg::HejlDawson => ToneMapping::HejlDawson,
            ToneArg::Hable => ToneMapping::Hable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DemoScene {
    /// Checkered floor with one sphere per material and a small mesh
    Spheres,
    /// Procedural heightfield
    Terrain,
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Square pyramid, flat shaded.
fn pyramid() -> MeshData {
    let positions = vec![
        Vec3::new(-0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, 0.5),
        Vec3::new(-0.5, 0.0, 0.5),
        Vec3::new(0.0, 0.9, 0.0),
    ];
    let indices = vec![0, 2, 1, 0, 3, 2, 0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4];
    MeshData::new(positions, indices, None)
}

fn spheres_scene(seed: u32) -> Result<Scene> {
    let mut builder = Scene::builder().with_seed(seed);

    let checker = builder.add_texture(Texture::checkerboard(
        Vec3::new(0.8, 0.8, 0.8),
        Vec3::new(0.2, 0.25, 0.3),
        4.0,
    ));
    let floor_surface = builder.add_surface(Surface::new(Material::Lambertian, checker));
    let floor = builder.add_plane(Plane::new(Vec3::Y, 0.0));
    builder.add_primitive(floor, floor_surface);

    let materials = [
        (Material::Lambertian, Vec3::new(0.8, 0.3, 0.2)),
        (Material::Phong { exponent: 40.0 }, Vec3::new(0.2, 0.6, 0.3)),
        (Material::Reflection, Vec3::new(0.9, 0.9, 0.9)),
        (Material::Glass { ior: 1.5 }, Vec3::new(1.0, 1.0, 1.0)),
        (Material::ClearCoat, Vec3::new(0.1, 0.2, 0.7)),
    ];
    for (i, (material, albedo)) in materials.into_iter().enumerate() {
        let tex = builder.add_texture(Texture::constant(albedo.x, albedo.y, albedo.z));
        let surface = builder.add_surface(Surface::new(material, tex));
        let x = (i as f32 - 2.0) * 1.1;
        let sphere = builder.add_sphere(Sphere::new(Vec3::new(x, 0.5, -3.0), 0.5));
        builder.add_primitive(sphere, surface);
    }

    let marble = builder.add_texture(Texture::FractalNoise {
        addend: Vec3::splat(0.5),
        multiplier: Vec3::new(0.4, 0.35, 0.3),
        frequency: 3.0,
        gain: 0.5,
        octaves: 5,
    });
    let mesh_surface = builder.add_surface(Surface::new(Material::Lambertian, marble).with_noise(0.2, 8.0));
    let mesh = builder.add_mesh(&pyramid())?;
    let placement = builder.add_transform(
        Mat4::from_translation(Vec3::new(1.6, 0.0, -1.6)) * Mat4::from_rotation_y(0.6),
    )?;
    builder.add_transformed(mesh, mesh_surface, placement);

    let glow = builder.add_texture(Texture::constant(4.0, 3.6, 3.0));
    let black = builder.add_texture(Texture::constant(0.0, 0.0, 0.0));
    let lamp_surface = builder.add_surface(Surface::new(Material::Lambertian, black).with_emission(glow));
    let lamp = builder.add_sphere(Sphere::new(Vec3::new(-1.8, 0.25, -1.8), 0.25));
    builder.add_primitive(lamp, lamp_surface);

    Ok(builder.build()?)
}

fn terrain_scene(seed: u32) -> Result<Scene> {
    let mut builder = Scene::builder().with_seed(seed);
    let rock = builder.add_texture(Texture::FractalNoise {
        addend: Vec3::new(0.45, 0.42, 0.38),
        multiplier: Vec3::splat(0.2),
        frequency: 0.8,
        gain: 0.5,
        octaves: 4,
    });
    let surface = builder.add_surface(Surface::new(Material::Lambertian, rock));
    let terrain = builder.add_terrain(Terrain::new(-1.5, 1.2, 0.2).with_seed(seed));
    builder.add_primitive(terrain, surface);
    Ok(builder.build()?)
}

fn camera_for(scene: DemoScene, width: u32, height: u32) -> Camera {
    let camera = Camera::new().with_resolution(width, height);
    match scene {
        DemoScene::Spheres => camera
            .with_position(Vec3::new(0.0, 1.4, 1.5), Vec3::new(0.0, 0.4, -3.0), Vec3::Y)
            .with_lens(45.0, 0.02, 4.7),
        DemoScene::Terrain => camera
            .with_position(Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, -0.5, -6.0), Vec3::Y)
            .with_lens(60.0, 0.0, 1.0),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(tone) = args.tone_mapping {
        config.tone_mapping = tone.into();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let scene = match args.scene {
        DemoScene::Spheres => spheres_scene(config.seed as u32)?,
        DemoScene::Terrain => terrain_scene(config.seed as u32)?,
    };
    log::info!("Built {:?} scene with {} primitives", args.scene, scene.primitives().len());

    let camera = camera_for(args.scene, args.width, args.height);
    let scheduler = match args.threads {
        Some(n) => prism_renderer::ThreadPoolScheduler::with_threads(n).context("Failed to build thread pool")?,
        None => prism_renderer::ThreadPoolScheduler::new(),
    };
    let mut renderer = Renderer::with_scheduler(camera, config, scheduler).context("Invalid render configuration")?;
    renderer.set_sky(Sky::new(3.0, Vec3::new(-0.4, 0.6, 0.5)));

    let start = Instant::now();
    for _ in 0..args.frames.max(1) {
        renderer.render_frame(&scene);
    }
    log::info!(
        "Rendered {} frames at {}x{} in {:.2?}",
        renderer.frame(),
        renderer.width(),
        renderer.height(),
        start.elapsed()
    );

    let rgba: Vec<u8> = renderer.pixels().iter().flat_map(|p| p.to_rgba()).collect();
    let image = image::RgbaImage::from_raw(renderer.width(), renderer.height(), rgba)
        .context("Pixel buffer does not match the image size")?;
    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Wrote {}", args.output.display());

    Ok(())
}
