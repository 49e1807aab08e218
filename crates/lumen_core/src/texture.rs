//! Texture Registry.
//!
//! Maps texture descriptions to callable texture programs. Image and HDR files
//! are decoded once, when first bound, and shared by every material that asks
//! for the same description.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_math::{Color, Vec3};
use thiserror::Error;

use crate::context::{ContextError, ProgramId, RenderContext};
use crate::program::sets;

/// Errors that can occur while binding a texture.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to load texture {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {} is unusable: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Color lookup at a surface point.
pub trait Texture: Send + Sync + fmt::Debug {
    /// Color at texture coordinates `(u, v)` and point `p`.
    fn value(&self, u: f32, v: f32, p: Vec3) -> Color;

    /// Entry point of this texture kind in the `textures` program set.
    fn entry_point(&self) -> &'static str;

    /// Environment mapping for HDR textures, read only by the background.
    fn environment_mapping(&self) -> Option<EnvironmentMapping> {
        None
    }
}

/// How an HDR environment is wrapped around the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentMapping {
    Spherical,
    Cylindrical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTexture {
    pub color: Color,
}

impl ConstantTexture {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Texture for ConstantTexture {
    fn value(&self, _u: f32, _v: f32, _p: Vec3) -> Color {
        self.color
    }

    fn entry_point(&self) -> &'static str {
        "constant_texture"
    }
}

/// 3D checkerboard alternating between two sub-textures.
#[derive(Debug, Clone)]
pub struct CheckerTexture {
    pub even: Arc<dyn Texture>,
    pub odd: Arc<dyn Texture>,
}

impl Texture for CheckerTexture {
    fn value(&self, u: f32, v: f32, p: Vec3) -> Color {
        let sines = (10.0 * p.x).sin() * (10.0 * p.y).sin() * (10.0 * p.z).sin();
        if sines < 0.0 {
            self.odd.value(u, v, p)
        } else {
            self.even.value(u, v, p)
        }
    }

    fn entry_point(&self) -> &'static str {
        "checker_texture"
    }
}

/// LDR image, stored as linear RGBA.
#[derive(Clone)]
pub struct ImageTexture {
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 4]>,
    path: PathBuf,
}

impl ImageTexture {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, path: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Decode an image file into linear RGBA.
    pub fn load(path: &Path) -> TextureResult<Self> {
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Decode {
                path: path.to_path_buf(),
                reason: "image has no pixels".to_string(),
            });
        }

        let pixels = rgba
            .pixels()
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();

        Ok(Self::new(width, height, pixels, path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn texel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, _] = self
            .pixels
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0]);
        Color::new(r, g, b)
    }
}

impl Texture for ImageTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Color {
        bilinear(self.width, self.height, u, v, |x, y| self.texel(x, y))
    }

    fn entry_point(&self) -> &'static str {
        "image_texture"
    }
}

impl fmt::Debug for ImageTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTexture")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// High dynamic range environment image, linear float RGB.
#[derive(Clone)]
pub struct HdrTexture {
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 3]>,
    path: PathBuf,
    mapping: EnvironmentMapping,
}

impl HdrTexture {
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<[f32; 3]>,
        path: impl Into<PathBuf>,
        mapping: EnvironmentMapping,
    ) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
            mapping,
        }
    }

    /// Decode an HDR file. Values are kept as-is, no color conversion.
    pub fn load(path: &Path, mapping: EnvironmentMapping) -> TextureResult<Self> {
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Decode {
                path: path.to_path_buf(),
                reason: "image has no pixels".to_string(),
            });
        }

        let pixels = rgb.pixels().map(|p| p.0).collect();
        Ok(Self::new(width, height, pixels, path, mapping))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mapping(&self) -> EnvironmentMapping {
        self.mapping
    }

    fn texel(&self, x: u32, y: u32) -> Color {
        let [r, g, b] = self
            .pixels
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or([0.0; 3]);
        Color::new(r, g, b)
    }
}

impl Texture for HdrTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Color {
        bilinear(self.width, self.height, u, v, |x, y| self.texel(x, y))
    }

    fn entry_point(&self) -> &'static str {
        "hdr_texture"
    }

    fn environment_mapping(&self) -> Option<EnvironmentMapping> {
        Some(self.mapping)
    }
}

impl fmt::Debug for HdrTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdrTexture")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mapping", &self.mapping)
            .finish()
    }
}

/// Bilinear lookup with wrapping UVs. (0, 0) is the bottom-left of the image.
fn bilinear(width: u32, height: u32, u: f32, v: f32, texel: impl Fn(u32, u32) -> Color) -> Color {
    let u = u.rem_euclid(1.0);
    let v = v.rem_euclid(1.0);

    let x = u * (width as f32 - 1.0);
    let y = (1.0 - v) * (height as f32 - 1.0); // flip V for image rows

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let (fx, fy) = (x.fract(), y.fract());

    let top = texel(x0, y0).lerp(texel(x1, y0), fx);
    let bottom = texel(x0, y1).lerp(texel(x1, y1), fx);
    top.lerp(bottom, fy)
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// What a texture should be, before anything is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureDesc {
    Constant(Color),
    Checker {
        even: Box<TextureDesc>,
        odd: Box<TextureDesc>,
    },
    Image(PathBuf),
    Hdr {
        path: PathBuf,
        mapping: EnvironmentMapping,
    },
}

impl TextureDesc {
    pub fn constant(r: f32, g: f32, b: f32) -> Self {
        TextureDesc::Constant(Color::new(r, g, b))
    }

    pub fn checker(even: TextureDesc, odd: TextureDesc) -> Self {
        TextureDesc::Checker {
            even: Box::new(even),
            odd: Box::new(odd),
        }
    }

    /// Hashable identity used for dedup.
    pub fn key(&self) -> TextureKey {
        match self {
            TextureDesc::Constant(color) => TextureKey::Constant(color.to_array().map(f32::to_bits)),
            TextureDesc::Checker { even, odd } => {
                TextureKey::Checker(Box::new(even.key()), Box::new(odd.key()))
            }
            TextureDesc::Image(path) => TextureKey::Image(path.clone()),
            TextureDesc::Hdr { path, mapping } => TextureKey::Hdr(path.clone(), *mapping),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureKey {
    Constant([u32; 3]),
    Checker(Box<TextureKey>, Box<TextureKey>),
    Image(PathBuf),
    Hdr(PathBuf, EnvironmentMapping),
}

/// A bound texture: its callable program plus the host lookup.
///
/// Composite textures keep the handles of the textures they sample, so the
/// callable ids of a checker's `even` and `odd` stay reachable.
#[derive(Debug, Clone)]
pub struct TextureHandle {
    program: ProgramId,
    texture: Arc<dyn Texture>,
    operands: Vec<TextureHandle>,
}

impl TextureHandle {
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    /// Sub-textures in binding order; `[even, odd]` for a checker.
    pub fn operands(&self) -> &[TextureHandle] {
        &self.operands
    }

    pub fn value(&self, u: f32, v: f32, p: Vec3) -> Color {
        self.texture.value(u, v, p)
    }
}

/// Deduplicating texture registry.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    handles: HashMap<TextureKey, TextureHandle>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a description to a callable texture program.
    ///
    /// Equal descriptions share one handle; files are decoded on the first bind.
    pub fn bind(&mut self, ctx: &mut RenderContext, desc: &TextureDesc) -> TextureResult<TextureHandle> {
        let key = desc.key();
        if let Some(handle) = self.handles.get(&key) {
            return Ok(handle.clone());
        }

        let mut operands = Vec::new();
        let texture: Arc<dyn Texture> = match desc {
            TextureDesc::Constant(color) => Arc::new(ConstantTexture::new(*color)),
            TextureDesc::Checker { even, odd } => {
                let even = self.bind(ctx, even)?;
                let odd = self.bind(ctx, odd)?;
                let checker = CheckerTexture {
                    even: even.texture.clone(),
                    odd: odd.texture.clone(),
                };
                operands = vec![even, odd];
                Arc::new(checker)
            }
            TextureDesc::Image(path) => {
                let image = ImageTexture::load(path)?;
                log::debug!("Decoded image texture {} ({}x{})", path.display(), image.width, image.height);
                Arc::new(image)
            }
            TextureDesc::Hdr { path, mapping } => {
                let hdr = HdrTexture::load(path, *mapping)?;
                log::debug!("Decoded HDR texture {} ({}x{})", path.display(), hdr.width, hdr.height);
                Arc::new(hdr)
            }
        };

        let program = ctx.create_program(sets::TEXTURES, texture.entry_point())?;
        let handle = TextureHandle {
            program,
            texture,
            operands,
        };
        self.handles.insert(key, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, key: &TextureKey) -> Option<&TextureHandle> {
        self.handles.get(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
