//! Error types for scene assembly.

use std::path::PathBuf;

use lumen_core::{ContextError, MaterialError, MeshError, TextureError};
use lumen_math::Vec3;
use thiserror::Error;

use crate::background::BackgroundKindError;
use crate::group::AccelKindError;
use crate::shape::ShapeKind;

/// Errors raised while building primitives and groups.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{shape} radius must be finite and positive, got {radius}")]
    InvalidRadius { shape: &'static str, radius: f32 },

    #[error("{shape} density must be finite and non-negative, got {density}")]
    InvalidDensity { shape: &'static str, density: f32 },

    #[error("moving sphere needs time1 > time0, got [{time0}, {time1}]")]
    InvalidTimeRange { time0: f32, time1: f32 },

    #[error("{shape} has empty or inverted extents")]
    DegenerateExtent { shape: &'static str },

    #[error("{shape} parameters must be finite")]
    NonFinite { shape: &'static str },

    #[error("instance transform is not invertible (scale {scale})")]
    SingularTransform { scale: Vec3 },

    #[error("primitive has no material bound")]
    NoMaterial,

    #[error("material slot {slot} is out of range for {count} bound materials")]
    MaterialSlot { slot: u32, count: usize },

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while wiring the sampling entry point.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("emissive {0} primitives cannot be sampled as lights")]
    UnsupportedLight(ShapeKind),

    #[error("light table has {lights} entries but {emissions} emission values")]
    TableMismatch { lights: usize, emissions: usize },

    #[error("light index {index} is out of range for {count} lights")]
    LightIndex { index: usize, count: usize },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type SamplingResult<T> = Result<T, SamplingError>;

/// Errors from loading build configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from assembling a named scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("unknown scene '{0}', expected one of in_one_weekend, moving_spheres, cornell, cornell_smoke, mesh_showcase")]
    UnknownScene(String),

    #[error("scene '{0}' needs a mesh path in the build config")]
    MissingMesh(String),

    #[error(transparent)]
    Background(#[from] BackgroundKindError),

    #[error(transparent)]
    Acceleration(#[from] AccelKindError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type SceneResult<T> = Result<T, SceneError>;
