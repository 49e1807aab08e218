//! Named demo scenes and the wiring that turns one into an entry point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lumen_core::{MaterialDesc, TextureDesc};
use lumen_math::{Axis, Vec3};
use rand::Rng;

use crate::background::{wire_background, Background};
use crate::builder::{MeshOptions, SceneBuilder};
use crate::camera::Camera;
use crate::config::BuildConfig;
use crate::error::{SceneError, SceneResult};
use crate::group::{GroupBuilder, Instance, SceneGroup, Transform};
use crate::lights::LightTable;
use crate::sampling::{self, BrdfSampler, LightSampler, RenderEntryPoint};

/// How a scene is lit.
#[derive(Debug, Clone, PartialEq)]
pub enum Lighting {
    /// Emissive primitives are sampled directly; rays that escape see black
    EmissiveLights,
    /// Light comes from the background only
    Background(Background),
}

/// An assembled scene ready for wiring.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub group: Arc<SceneGroup>,
    pub camera: Camera,
    pub lighting: Lighting,
}

/// Demo scenes that can be built by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneName {
    InOneWeekend,
    MovingSpheres,
    Cornell,
    CornellSmoke,
    MeshShowcase,
}

impl SceneName {
    pub const ALL: [SceneName; 5] = [
        SceneName::InOneWeekend,
        SceneName::MovingSpheres,
        SceneName::Cornell,
        SceneName::CornellSmoke,
        SceneName::MeshShowcase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SceneName::InOneWeekend => "in_one_weekend",
            SceneName::MovingSpheres => "moving_spheres",
            SceneName::Cornell => "cornell",
            SceneName::CornellSmoke => "cornell_smoke",
            SceneName::MeshShowcase => "mesh_showcase",
        }
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SceneName {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        SceneName::ALL
            .into_iter()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| SceneError::UnknownScene(s.to_string()))
    }
}

/// Assemble the named scene with `builder`.
pub fn build_scene<R: Rng + ?Sized>(
    name: SceneName,
    builder: &mut SceneBuilder<'_>,
    config: &BuildConfig,
    rng: &mut R,
) -> SceneResult<SceneDescription> {
    let scene = match name {
        SceneName::InOneWeekend => in_one_weekend(builder, config, rng)?,
        SceneName::MovingSpheres => moving_spheres(builder, config, rng)?,
        SceneName::Cornell => cornell(builder, config, false)?,
        SceneName::CornellSmoke => cornell(builder, config, true)?,
        SceneName::MeshShowcase => mesh_showcase(builder, config, rng)?,
    };

    log::info!(
        "Assembled scene '{}': {} primitives, {} top-level children",
        name,
        scene.group.primitive_count(),
        scene.group.len()
    );
    Ok(scene)
}

/// Wire an assembled scene: BRDF tables, lights or background, and the
/// exception program.
pub fn wire_scene(builder: &mut SceneBuilder<'_>, scene: &SceneDescription) -> SceneResult<RenderEntryPoint> {
    let (ctx, textures) = builder.parts();
    let brdf = BrdfSampler::standard(ctx)?;

    let entry = match &scene.lighting {
        Lighting::EmissiveLights => {
            let table = LightTable::scan(&scene.group)?;
            let lights = LightSampler::from_table(ctx, table)?;
            let mut entry = sampling::wire(ctx, &brdf, &lights, Arc::clone(&scene.group))?;
            wire_background(ctx, textures, &mut entry, &Background::black())?;
            entry
        }
        Lighting::Background(background) => {
            let mut entry = sampling::wire_brdf_only(ctx, &brdf, Arc::clone(&scene.group))?;
            wire_background(ctx, textures, &mut entry, background)?;
            entry
        }
    };

    sampling::set_exception_program(ctx)?;
    Ok(entry)
}

fn lookat_camera(config: &BuildConfig, from: Vec3, at: Vec3, vfov: f32, aperture: f32) -> Camera {
    let mut camera = Camera::new()
        .with_resolution(config.width, config.height)
        .with_position(from, at, Vec3::Y)
        .with_lens(vfov, aperture, 10.0)
        .with_shutter(0.0, 1.0);
    camera.initialize();
    camera
}

/// Lambertian, metal or glass chosen the way the random sphere grid picks.
fn random_material<R: Rng + ?Sized>(choose: f32, rng: &mut R) -> MaterialDesc {
    if choose < 0.8 {
        let mut c = || rng.gen::<f32>() * rng.gen::<f32>();
        let (r, g, b) = (c(), c(), c());
        MaterialDesc::lambertian(r, g, b)
    } else if choose < 0.95 {
        let mut c = || 0.5 * (1.0 + rng.gen::<f32>());
        let (r, g, b) = (c(), c(), c());
        MaterialDesc::metal(r, g, b, 0.5 * rng.gen::<f32>())
    } else {
        MaterialDesc::dielectric(1.5)
    }
}

fn in_one_weekend<R: Rng + ?Sized>(
    builder: &mut SceneBuilder<'_>,
    config: &BuildConfig,
    rng: &mut R,
) -> SceneResult<SceneDescription> {
    let mut group = builder.group();

    let checker = MaterialDesc::Lambertian(TextureDesc::checker(
        TextureDesc::constant(0.2, 0.3, 0.1),
        TextureDesc::constant(0.9, 0.9, 0.9),
    ));
    let ground = builder.material(&checker)?;
    group.add_primitive(builder.sphere(Vec3::new(0.0, -1000.0, -1.0), 1000.0, &ground)?);

    for a in -11..11 {
        for b in -11..11 {
            let choose = rng.gen::<f32>();
            let center = Vec3::new(a as f32 + rng.gen::<f32>(), 0.2, b as f32 + rng.gen::<f32>());
            let material = builder.material(&random_material(choose, rng))?;
            group.add_primitive(builder.sphere(center, 0.2, &material)?);
        }
    }

    let glass = builder.material(&MaterialDesc::dielectric(1.5))?;
    group.add_primitive(builder.sphere(Vec3::new(-4.0, 1.0, 0.0), 1.0, &glass)?);

    let brown = builder.material(&MaterialDesc::lambertian(0.4, 0.2, 0.1))?;
    let mut moved = GroupBuilder::new(builder.acceleration());
    moved.add_primitive(builder.sphere(Vec3::new(4.0, 1.0, 0.0), 1.0, &brown)?);
    group.add_transformed(moved.build(), Transform::from_translation(Vec3::new(3.0, 0.0, 0.0)))?;

    let steel = builder.material(&MaterialDesc::metal(0.7, 0.6, 0.5, 0.0))?;
    group.add_primitive(builder.sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, &steel)?);

    let light = builder.material(&MaterialDesc::diffuse_light(4.0, 4.0, 4.0))?;
    group.add_primitive(builder.z_rect(3.0, 5.0, 1.0, 3.0, -2.0, false, &light)?);

    Ok(SceneDescription {
        group: Arc::new(group.build()),
        camera: lookat_camera(config, Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, 20.0, 0.1),
        lighting: Lighting::Background(Background::sky()),
    })
}

fn moving_spheres<R: Rng + ?Sized>(
    builder: &mut SceneBuilder<'_>,
    config: &BuildConfig,
    rng: &mut R,
) -> SceneResult<SceneDescription> {
    let mut group = builder.group();

    let ground = builder.material(&MaterialDesc::lambertian(0.5, 0.5, 0.5))?;
    group.add_primitive(builder.sphere(Vec3::new(0.0, -1000.0, -1.0), 1000.0, &ground)?);

    for a in -11..11 {
        for b in -11..11 {
            let choose = rng.gen::<f32>();
            let center = Vec3::new(a as f32 + rng.gen::<f32>(), 0.2, b as f32 + rng.gen::<f32>());
            let material = builder.material(&random_material(choose, rng))?;
            let prim = if choose < 0.8 {
                let center1 = center + Vec3::new(0.0, 0.5 * rng.gen::<f32>(), 0.0);
                builder.moving_sphere(center, center1, 0.0, 1.0, 0.2, &material)?
            } else {
                builder.sphere(center, 0.2, &material)?
            };
            group.add_primitive(prim);
        }
    }

    let glass = builder.material(&MaterialDesc::dielectric(1.5))?;
    group.add_primitive(builder.sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, &glass)?);
    let brown = builder.material(&MaterialDesc::lambertian(0.4, 0.2, 0.1))?;
    group.add_primitive(builder.sphere(Vec3::new(-4.0, 1.0, 0.0), 1.0, &brown)?);
    let steel = builder.material(&MaterialDesc::metal(0.7, 0.6, 0.5, 0.0))?;
    group.add_primitive(builder.sphere(Vec3::new(4.0, 1.0, 0.0), 1.0, &steel)?);

    let mut c = || rng.gen::<f32>() * rng.gen::<f32>();
    let (r, g, b) = (c(), c(), c());
    let box_material = builder.material(&MaterialDesc::lambertian(r, g, b))?;
    let boxed = builder.transformed_box(Vec3::new(3.0, 2.0, 2.0), Vec3::new(3.0, 2.0, 2.0), -180.0, &box_material)?;
    group.add(boxed);

    Ok(SceneDescription {
        group: Arc::new(group.build()),
        camera: lookat_camera(config, Vec3::new(17.0, 13.0, 3.0), Vec3::ZERO, 20.0, 0.1),
        lighting: Lighting::Background(Background::sky()),
    })
}

/// Cornell box; with `smoke` the two boxes are participating media.
fn cornell(builder: &mut SceneBuilder<'_>, config: &BuildConfig, smoke: bool) -> SceneResult<SceneDescription> {
    let mut group = builder.group();

    let red = builder.material(&MaterialDesc::lambertian(0.65, 0.05, 0.05))?;
    let white = builder.material(&MaterialDesc::lambertian(0.73, 0.73, 0.73))?;
    let green = builder.material(&MaterialDesc::lambertian(0.12, 0.45, 0.15))?;
    let light = builder.material(&MaterialDesc::diffuse_light(15.0, 15.0, 15.0))?;

    group.add_primitive(builder.x_rect(0.0, 555.0, 0.0, 555.0, 555.0, true, &green)?);
    group.add_primitive(builder.x_rect(0.0, 555.0, 0.0, 555.0, 0.0, false, &red)?);
    group.add_primitive(builder.y_rect(213.0, 343.0, 227.0, 332.0, 554.0, false, &light)?);
    group.add_primitive(builder.y_rect(0.0, 555.0, 0.0, 555.0, 555.0, true, &white)?);
    group.add_primitive(builder.y_rect(0.0, 555.0, 0.0, 555.0, 0.0, false, &white)?);
    group.add_primitive(builder.z_rect(0.0, 555.0, 0.0, 555.0, 555.0, true, &white)?);

    let boxes = [
        (Vec3::new(265.0, 0.0, 295.0), Vec3::new(165.0, 330.0, 165.0), 15.0),
        (Vec3::new(130.0, 0.0, 65.0), Vec3::splat(165.0), -18.0),
    ];
    if smoke {
        let dark = builder.material(&MaterialDesc::lambertian(0.0, 0.0, 0.0))?;
        let bright = builder.material(&MaterialDesc::lambertian(1.0, 1.0, 1.0))?;
        for ((position, size, angle), material) in boxes.into_iter().zip([&dark, &bright]) {
            let mut medium = GroupBuilder::new(builder.acceleration());
            medium.add_primitive(builder.volume_box(Vec3::ZERO, size, 0.01, material)?);
            let transform = Transform::from_translation(position).with_rotation_y_degrees(angle);
            group.add(Instance::new(Arc::new(medium.build()), transform)?);
        }
    } else {
        for (position, size, angle) in boxes {
            group.add(builder.transformed_box(position, size, angle, &white)?);
        }
    }

    Ok(SceneDescription {
        group: Arc::new(group.build()),
        camera: lookat_camera(
            config,
            Vec3::new(278.0, 278.0, -800.0),
            Vec3::new(278.0, 278.0, 0.0),
            40.0,
            0.0,
        ),
        lighting: Lighting::EmissiveLights,
    })
}

/// A mesh from the config on an infinite floor under the sky.
fn mesh_showcase<R: Rng + ?Sized>(
    builder: &mut SceneBuilder<'_>,
    config: &BuildConfig,
    rng: &mut R,
) -> SceneResult<SceneDescription> {
    let path = config
        .mesh
        .as_ref()
        .ok_or_else(|| SceneError::MissingMesh(SceneName::MeshShowcase.to_string()))?;
    let options = MeshOptions {
        assets_folder: config.assets_dir.clone(),
        scale: config.mesh_scale,
        material: None,
    };
    let mesh = builder.mesh(path, &options, rng)?;

    let bounds = mesh.geometry().bounding_box();
    let (center, floor, extent) = match bounds {
        Some(bbox) => (
            bbox.centroid(),
            bbox.y.min,
            (bbox.max_point() - bbox.min_point()).max_element(),
        ),
        None => (Vec3::ZERO, 0.0, 1.0),
    };

    let mut group = builder.group();
    group.add_primitive(mesh);
    let ground = builder.material(&MaterialDesc::lambertian(0.5, 0.5, 0.5))?;
    group.add_primitive(builder.plane(Axis::Y, floor, false, &ground)?);

    let from = center + Vec3::new(0.0, 0.5, 2.5) * extent.max(1e-3);
    Ok(SceneDescription {
        group: Arc::new(group.build()),
        camera: lookat_camera(config, from, center, 40.0, 0.0),
        lighting: Lighting::Background(Background::sky()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;
    use lumen_core::RenderContext;
    use lumen_math::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn small_config() -> BuildConfig {
        BuildConfig {
            width: 64,
            height: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_scene_name_parse() {
        assert_eq!("cornell".parse::<SceneName>().unwrap(), SceneName::Cornell);
        assert_eq!("Cornell-Smoke".parse::<SceneName>().unwrap(), SceneName::CornellSmoke);
        assert!(matches!(
            "teapot".parse::<SceneName>(),
            Err(SceneError::UnknownScene(name)) if name == "teapot"
        ));
    }

    #[test]
    fn test_five_walls_and_two_boxes_have_one_light() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let white = builder.material(&MaterialDesc::lambertian(0.73, 0.73, 0.73)).unwrap();
        let light = builder.material(&MaterialDesc::diffuse_light(15.0, 15.0, 15.0)).unwrap();

        let mut group = builder.group();
        group.add_primitive(builder.x_rect(0.0, 555.0, 0.0, 555.0, 555.0, true, &white).unwrap());
        group.add_primitive(builder.x_rect(0.0, 555.0, 0.0, 555.0, 0.0, false, &white).unwrap());
        group.add_primitive(builder.y_rect(213.0, 343.0, 227.0, 332.0, 554.0, false, &light).unwrap());
        group.add_primitive(builder.y_rect(0.0, 555.0, 0.0, 555.0, 0.0, false, &white).unwrap());
        group.add_primitive(builder.z_rect(0.0, 555.0, 0.0, 555.0, 555.0, true, &white).unwrap());
        group.add(
            builder
                .transformed_box(Vec3::new(265.0, 0.0, 295.0), Vec3::new(165.0, 330.0, 165.0), 15.0, &white)
                .unwrap(),
        );
        group.add(
            builder
                .transformed_box(Vec3::new(130.0, 0.0, 65.0), Vec3::splat(165.0), -18.0, &white)
                .unwrap(),
        );
        let group = group.build();

        assert_eq!(group.primitive_count(), 17);
        let table = LightTable::scan(&group).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].primitive.kind(), ShapeKind::Rect(Axis::Y));
    }

    #[test]
    fn test_cornell_wires_one_light() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let mut rng = StdRng::seed_from_u64(1);

        let scene = build_scene(SceneName::Cornell, &mut builder, &small_config(), &mut rng).unwrap();
        assert_eq!(scene.group.primitive_count(), 18);
        assert_eq!(scene.lighting, Lighting::EmissiveLights);

        let entry = wire_scene(&mut builder, &scene).unwrap();
        assert_eq!(entry.num_lights(), 1);
        assert!(entry.scattering_pdf.is_none());
        let lights = entry.lights.as_ref().unwrap();
        assert_eq!(lights.emissions.as_slice(), &[Color::splat(15.0)]);
        assert_eq!(entry.background().unwrap().radiance(Vec3::Y), Color::ZERO);

        let installed = ctx.installed();
        assert_eq!(installed.ray_generation, Some(entry.ray_generation));
        assert!(installed.miss.is_some());
        assert!(installed.exception.is_some());
    }

    #[test]
    fn test_cornell_smoke_uses_volumes() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let mut rng = StdRng::seed_from_u64(1);

        let scene = build_scene(SceneName::CornellSmoke, &mut builder, &small_config(), &mut rng).unwrap();
        let mut volumes = 0;
        scene.group.visit_primitives(|prim, _| {
            if prim.density().is_some() {
                volumes += 1;
            }
        });
        assert_eq!(volumes, 2);
        assert_eq!(scene.group.primitive_count(), 8);
    }

    #[test]
    fn test_random_scenes_are_seeded() {
        let build = |name| {
            let mut ctx = RenderContext::standard();
            let mut builder = SceneBuilder::new(&mut ctx);
            let mut rng = StdRng::seed_from_u64(42);
            let scene = build_scene(name, &mut builder, &small_config(), &mut rng).unwrap();
            (scene.group.primitive_count(), builder.materials().len())
        };

        let (count, materials) = build(SceneName::InOneWeekend);
        assert_eq!(count, 1 + 22 * 22 + 4);
        assert_eq!(build(SceneName::InOneWeekend), (count, materials));

        let (count, _) = build(SceneName::MovingSpheres);
        assert_eq!(count, 1 + 22 * 22 + 3 + 6);
    }

    #[test]
    fn test_in_one_weekend_uses_background() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let mut rng = StdRng::seed_from_u64(3);

        let scene = build_scene(SceneName::InOneWeekend, &mut builder, &small_config(), &mut rng).unwrap();
        assert_eq!(scene.camera.aperture(), 0.1);
        let entry = wire_scene(&mut builder, &scene).unwrap();
        assert_eq!(entry.num_lights(), 0);
        assert!(entry.lights.is_none());
        assert!(entry.scattering_pdf.is_some());
        assert_eq!(ctx.program(entry.miss.unwrap()).unwrap().entry, "gradient_color");
    }

    #[test]
    fn test_mesh_showcase_needs_mesh() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(matches!(
            build_scene(SceneName::MeshShowcase, &mut builder, &small_config(), &mut rng),
            Err(SceneError::MissingMesh(_))
        ));
    }

    #[test]
    fn test_mesh_showcase_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4").unwrap();

        let config = BuildConfig {
            mesh: Some(path),
            assets_dir: dir.path().to_path_buf(),
            ..small_config()
        };
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let mut rng = StdRng::seed_from_u64(3);

        let scene = build_scene(SceneName::MeshShowcase, &mut builder, &config, &mut rng).unwrap();
        assert_eq!(scene.group.primitive_count(), 2);
        assert_eq!(scene.group.unbounded_count(), 1);
        assert!(wire_scene(&mut builder, &scene).is_ok());
    }
}
