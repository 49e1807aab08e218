//! Lumen Scene - scene assembly and shading dispatch.
//!
//! Builds the host-side description of a scene for the path tracer:
//!
//! - **Geometry Builder**: spheres, rectangles, volumes, triangles, planes and
//!   boxes bound to their materials as [`Primitive`]s
//! - **Scene Graph Assembler**: groups, instances and acceleration structures
//! - **Importance-Sampling Wiring**: BRDF and light program tables plus the
//!   ray-generation entry point
//! - **Scenes**: named demo scenes built from a [`BuildConfig`]
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::RenderContext;
//! use lumen_scene::{build_scene, wire_scene, BuildConfig, SceneBuilder, SceneName};
//!
//! let config = BuildConfig::default();
//! let mut ctx = RenderContext::standard();
//! let mut builder = SceneBuilder::new(&mut ctx).with_acceleration(config.acceleration);
//! let scene = build_scene(SceneName::Cornell, &mut builder, &config, &mut rng)?;
//! let entry = wire_scene(&mut builder, &scene)?;
//! ```

pub mod background;
pub mod builder;
mod bvh;
pub mod camera;
pub mod config;
pub mod error;
pub mod group;
pub mod hittable;
pub mod lights;
pub mod mesh;
pub mod plane;
pub mod primitive;
pub mod rect;
pub mod sampling;
pub mod scenes;
pub mod shape;
pub mod sphere;
pub mod triangle;
pub mod volume;

pub use background::{wire_background, Background, BackgroundKind, BackgroundKindError, BoundBackground};
pub use builder::{MeshOptions, SceneBuilder};
pub use camera::Camera;
pub use config::BuildConfig;
pub use error::{
    BuildError, BuildResult, ConfigError, ConfigResult, SamplingError, SamplingResult, SceneError, SceneResult,
};
pub use group::{AccelKindError, Acceleration, GroupBuilder, Instance, Node, SceneGroup, Transform};
pub use hittable::{HitRecord, Hittable};
pub use lights::{LightEntry, LightTable};
pub use mesh::TriangleMesh;
pub use plane::Plane;
pub use primitive::{GeometryPrograms, Primitive};
pub use rect::Rect;
pub use sampling::{
    set_exception_program, wire, wire_brdf_only, BrdfPrograms, BrdfSampler, LightBuffers, LightPrograms,
    LightSampler, RenderEntryPoint, RAY_GENERATION_ENTRY,
};
pub use scenes::{build_scene, wire_scene, Lighting, SceneDescription, SceneName};
pub use shape::{Shape, ShapeKind};
pub use sphere::{MovingSphere, Sphere};
pub use triangle::Triangle;
pub use volume::{VolumeBox, VolumeSphere};
