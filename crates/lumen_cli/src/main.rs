use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_core::{ProgramLibrary, RenderContext};
use lumen_scene::{build_scene, wire_scene, Acceleration, BuildConfig, SceneBuilder, SceneName};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Assemble a named scene and report what was built.
#[derive(Debug, Parser)]
#[command(name = "lumen", version)]
struct Args {
    /// Scene to build: in_one_weekend, moving_spheres, cornell, cornell_smoke, mesh_showcase
    scene: String,

    #[arg(short, long, help = "JSON build config; flags override its values")]
    config: Option<PathBuf>,

    #[arg(long, help = "Image width in pixels")]
    width: Option<u32>,
    #[arg(long, help = "Image height in pixels")]
    height: Option<u32>,
    #[arg(short, long, help = "Seed for random scene content")]
    seed: Option<u64>,

    #[arg(short, long, help = "OBJ file for mesh_showcase")]
    mesh: Option<PathBuf>,
    #[arg(long, help = "Uniform scale applied to the mesh")]
    mesh_scale: Option<f32>,
    #[arg(long, help = "Folder that mesh textures are relative to")]
    assets_dir: Option<PathBuf>,

    #[arg(short, long, help = "Top-level accelerator: Bvh, Trbvh or NoAccel")]
    accel: Option<Acceleration>,

    #[arg(long, help = "Folder with compiled <set>.ptx program blobs")]
    programs: Option<PathBuf>,

    #[arg(long, help = "Print the effective build config as JSON and exit")]
    dump_config: bool,
}

impl Args {
    fn build_config(&self) -> Result<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::from_json_file(path)?,
            None => BuildConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(mesh) = &self.mesh {
            config.mesh = Some(mesh.clone());
        }
        if let Some(scale) = self.mesh_scale {
            config.mesh_scale = scale;
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = dir.clone();
        }
        if let Some(accel) = self.accel {
            config.acceleration = accel;
        }
        if let Some(dir) = &self.programs {
            config.program_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let config = args.build_config()?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let name: SceneName = args.scene.parse()?;

    let mut library = ProgramLibrary::standard();
    if let Some(dir) = &config.program_dir {
        library
            .load_blobs(dir)
            .with_context(|| format!("loading program blobs from {}", dir.display()))?;
    }
    let mut ctx = RenderContext::new(library, config.context_config());
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut builder = SceneBuilder::new(&mut ctx).with_acceleration(config.acceleration);
    let scene = build_scene(name, &mut builder, &config, &mut rng)
        .with_context(|| format!("building scene '{}'", name))?;
    let entry = wire_scene(&mut builder, &scene).with_context(|| format!("wiring scene '{}'", name))?;

    let textures = builder.textures().len();
    let materials = builder.materials().len();
    let bindings = builder.materials().binding_count();

    log::info!(
        "{}: {} primitives, {} materials ({} bindings), {} textures",
        name,
        scene.group.primitive_count(),
        materials,
        bindings,
        textures
    );
    log::info!(
        "{} lights, background {}, camera at {} looking at {}",
        entry.num_lights(),
        entry
            .background()
            .map(|b| b.kind().to_string())
            .unwrap_or_else(|| "none".to_string()),
        scene.camera.look_from(),
        scene.camera.look_at()
    );
    log::info!(
        "{} programs, {} bytes of buffers, {}x{} launch",
        ctx.program_count(),
        ctx.allocated_bytes(),
        scene.camera.image_width,
        scene.camera.image_height
    );

    Ok(())
}
