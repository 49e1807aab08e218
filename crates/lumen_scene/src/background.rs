//! Backgrounds: what a ray that leaves the scene sees.

use std::f32::consts::PI;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lumen_core::{sets, EnvironmentMapping, ProgramId, RenderContext, TextureDesc, TextureHandle, TextureRegistry};
use lumen_math::{Color, Vec3};
use thiserror::Error;

use crate::error::{BuildError, SamplingResult};
use crate::sampling::RenderEntryPoint;
use crate::sphere::Sphere;

/// Error returned when a string does not name a background kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown background '{0}', expected one of gradient, constant, image, hdr")]
pub struct BackgroundKindError(pub String);

/// Miss program variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundKind {
    Gradient,
    Constant,
    Image,
    Hdr,
}

impl BackgroundKind {
    /// Entry name in the `miss` program set.
    pub fn entry_point(self) -> &'static str {
        match self {
            BackgroundKind::Gradient => "gradient_color",
            BackgroundKind::Constant => "constant_color",
            BackgroundKind::Image => "image_background",
            BackgroundKind::Hdr => "environmental_mapping",
        }
    }
}

impl fmt::Display for BackgroundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackgroundKind::Gradient => "gradient",
            BackgroundKind::Constant => "constant",
            BackgroundKind::Image => "image",
            BackgroundKind::Hdr => "hdr",
        };
        f.write_str(name)
    }
}

impl FromStr for BackgroundKind {
    type Err = BackgroundKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gradient" | "sky" => Ok(BackgroundKind::Gradient),
            "constant" | "solid" => Ok(BackgroundKind::Constant),
            "image" => Ok(BackgroundKind::Image),
            "hdr" | "environment" => Ok(BackgroundKind::Hdr),
            _ => Err(BackgroundKindError(s.to_string())),
        }
    }
}

/// Background description.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Vertical blend from `bottom` (looking down) to `top` (looking up)
    Gradient { top: Color, bottom: Color },
    Constant(Color),
    Image(PathBuf),
    Hdr { path: PathBuf, mapping: EnvironmentMapping },
}

impl Background {
    /// Blue-to-white sky.
    pub fn sky() -> Self {
        Background::Gradient {
            top: Color::new(0.5, 0.7, 1.0),
            bottom: Color::ONE,
        }
    }

    pub fn black() -> Self {
        Background::Constant(Color::ZERO)
    }

    pub fn kind(&self) -> BackgroundKind {
        match self {
            Background::Gradient { .. } => BackgroundKind::Gradient,
            Background::Constant(_) => BackgroundKind::Constant,
            Background::Image(_) => BackgroundKind::Image,
            Background::Hdr { .. } => BackgroundKind::Hdr,
        }
    }

    /// Textures the miss program reads, in table order.
    fn texture_descs(&self) -> Vec<TextureDesc> {
        match self {
            Background::Gradient { top, bottom } => vec![TextureDesc::Constant(*top), TextureDesc::Constant(*bottom)],
            Background::Constant(color) => vec![TextureDesc::Constant(*color)],
            Background::Image(path) => vec![TextureDesc::Image(path.clone())],
            Background::Hdr { path, mapping } => vec![TextureDesc::Hdr {
                path: path.clone(),
                mapping: *mapping,
            }],
        }
    }
}

/// A background bound to its miss program and textures.
#[derive(Debug, Clone)]
pub struct BoundBackground {
    kind: BackgroundKind,
    program: ProgramId,
    textures: Vec<TextureHandle>,
    mapping: Option<EnvironmentMapping>,
}

impl BoundBackground {
    pub fn kind(&self) -> BackgroundKind {
        self.kind
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    /// The `is_spherical` flag of environment maps.
    pub fn is_spherical(&self) -> bool {
        self.mapping == Some(EnvironmentMapping::Spherical)
    }

    /// Radiance seen along `direction`.
    pub fn radiance(&self, direction: Vec3) -> Color {
        let unit = direction.normalize_or_zero();
        let texture = |i: usize, u: f32, v: f32| {
            self.textures
                .get(i)
                .map(|t| t.value(u, v, unit))
                .unwrap_or(Color::ZERO)
        };

        match self.kind {
            BackgroundKind::Gradient => {
                let t = 0.5 * (unit.y + 1.0);
                (1.0 - t) * texture(1, 0.0, 0.0) + t * texture(0, 0.0, 0.0)
            }
            BackgroundKind::Constant => texture(0, 0.0, 0.0),
            BackgroundKind::Image => {
                let (u, v) = Sphere::get_sphere_uv(unit);
                texture(0, u, v)
            }
            BackgroundKind::Hdr => {
                let (u, v) = if self.is_spherical() {
                    Sphere::get_sphere_uv(unit)
                } else {
                    let phi = (-unit.z).atan2(unit.x) + PI;
                    (phi / (2.0 * PI), 0.5 * (unit.y + 1.0))
                };
                texture(0, u, v)
            }
        }
    }
}

/// Bind `background` and install its miss program on `entry`.
pub fn wire_background(
    ctx: &mut RenderContext,
    textures: &mut TextureRegistry,
    entry: &mut RenderEntryPoint,
    background: &Background,
) -> SamplingResult<()> {
    let kind = background.kind();
    let handles = background
        .texture_descs()
        .iter()
        .map(|desc| textures.bind(ctx, desc).map_err(BuildError::from))
        .collect::<Result<Vec<_>, _>>()?;
    let program = ctx.create_program(sets::MISS, kind.entry_point())?;
    let mapping = match background {
        Background::Hdr { mapping, .. } => Some(*mapping),
        _ => None,
    };

    ctx.set_miss_program(program);
    log::debug!("Background: {} ({})", kind, program);
    entry.miss = Some(program);
    entry.background = Some(BoundBackground {
        kind,
        program,
        textures: handles,
        mapping,
    });
    Ok(())
}
