//! Material Registry.
//!
//! Materials are immutable, shared through `Arc`, and deduplicated by their
//! description. Binding a material to a primitive produces a `ShadingBinding`:
//! a fresh closest-hit program plus the texture programs the shader reads.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_math::{Color, Vec3};
use thiserror::Error;

use crate::brdf::{BrdfKind, ShadingParams};
use crate::context::{ContextError, ProgramId, RenderContext};
use crate::program::sets;
use crate::texture::{TextureDesc, TextureError, TextureHandle, TextureKey, TextureRegistry};

#[derive(Error, Debug)]
pub enum MaterialError {
    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type MaterialResult<T> = Result<T, MaterialError>;

/// Surface material.
///
/// Metal fuzz is stored as given; it is clamped when the material is bound.
#[derive(Debug, Clone)]
pub enum Material {
    Lambertian { albedo: TextureHandle },
    Metal { albedo: TextureHandle, fuzz: f32 },
    Dielectric { ref_idx: f32 },
    DiffuseLight { emit: TextureHandle },
}

impl Material {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Material::Lambertian { .. } => "lambertian",
            Material::Metal { .. } => "metal",
            Material::Dielectric { .. } => "dielectric",
            Material::DiffuseLight { .. } => "diffuse_light",
        }
    }

    /// Program set holding this material's closest-hit program.
    pub fn program_set(&self) -> &'static str {
        match self {
            Material::Lambertian { .. } => sets::LAMBERTIAN,
            Material::Metal { .. } => sets::METAL,
            Material::Dielectric { .. } => sets::DIELECTRIC,
            Material::DiffuseLight { .. } => sets::DIFFUSE_LIGHT,
        }
    }

    pub fn is_emissive(&self) -> bool {
        matches!(self, Material::DiffuseLight { .. })
    }

    /// Textures the shader reads, in table order.
    pub fn textures(&self) -> Vec<TextureHandle> {
        match self {
            Material::Lambertian { albedo } | Material::Metal { albedo, .. } => vec![albedo.clone()],
            Material::DiffuseLight { emit } => vec![emit.clone()],
            Material::Dielectric { .. } => Vec::new(),
        }
    }

    pub fn brdf(&self) -> Option<BrdfKind> {
        match self {
            Material::Lambertian { .. } => Some(BrdfKind::Lambertian),
            Material::Metal { .. } => Some(BrdfKind::Metal),
            Material::Dielectric { .. } => Some(BrdfKind::Dielectric),
            Material::DiffuseLight { .. } => None,
        }
    }

    /// Surface albedo at a hit. Dielectrics attenuate nothing.
    pub fn albedo(&self, u: f32, v: f32, p: Vec3) -> Color {
        match self {
            Material::Lambertian { albedo } | Material::Metal { albedo, .. } => albedo.value(u, v, p),
            Material::Dielectric { .. } => Color::ONE,
            Material::DiffuseLight { .. } => Color::ZERO,
        }
    }

    pub fn emitted(&self, u: f32, v: f32, p: Vec3) -> Color {
        match self {
            Material::DiffuseLight { emit } => emit.value(u, v, p),
            _ => Color::ZERO,
        }
    }
}

/// Material before its textures are bound.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialDesc {
    Lambertian(TextureDesc),
    Metal { albedo: TextureDesc, fuzz: f32 },
    Dielectric { ref_idx: f32 },
    DiffuseLight(TextureDesc),
}

impl MaterialDesc {
    pub fn lambertian(r: f32, g: f32, b: f32) -> Self {
        MaterialDesc::Lambertian(TextureDesc::constant(r, g, b))
    }

    pub fn metal(r: f32, g: f32, b: f32, fuzz: f32) -> Self {
        MaterialDesc::Metal {
            albedo: TextureDesc::constant(r, g, b),
            fuzz,
        }
    }

    pub fn dielectric(ref_idx: f32) -> Self {
        MaterialDesc::Dielectric { ref_idx }
    }

    pub fn diffuse_light(r: f32, g: f32, b: f32) -> Self {
        MaterialDesc::DiffuseLight(TextureDesc::constant(r, g, b))
    }

    fn key(&self) -> MaterialKey {
        match self {
            MaterialDesc::Lambertian(albedo) => MaterialKey::Lambertian(albedo.key()),
            MaterialDesc::Metal { albedo, fuzz } => MaterialKey::Metal(albedo.key(), fuzz.to_bits()),
            MaterialDesc::Dielectric { ref_idx } => MaterialKey::Dielectric(ref_idx.to_bits()),
            MaterialDesc::DiffuseLight(emit) => MaterialKey::DiffuseLight(emit.key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MaterialKey {
    Lambertian(TextureKey),
    Metal(TextureKey, u32),
    Dielectric(u32),
    DiffuseLight(TextureKey),
}

/// A material resolved for one primitive or mesh slot.
#[derive(Debug, Clone)]
pub struct ShadingBinding {
    pub material: Arc<Material>,
    pub closest_hit: ProgramId,
    /// Texture table entries, one per texture the material reads
    pub textures: Vec<TextureHandle>,
    pub params: ShadingParams,
    pub brdf: Option<BrdfKind>,
}

impl ShadingBinding {
    /// First texture program, or `ProgramId::NULL` for texture-less materials.
    pub fn texture_program(&self) -> ProgramId {
        self.textures
            .first()
            .map(TextureHandle::program)
            .unwrap_or(ProgramId::NULL)
    }

    pub fn is_emissive(&self) -> bool {
        self.material.is_emissive()
    }
}

/// Clamp applied to Metal fuzz when binding: values at or above 1 become 1.
pub fn effective_fuzz(fuzz: f32) -> f32 {
    if fuzz < 1.0 {
        fuzz.max(0.0)
    } else {
        1.0
    }
}

/// Deduplicating material registry.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: HashMap<MaterialKey, Arc<Material>>,
    bindings: usize,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a description into a shared material, binding its textures.
    pub fn material(
        &mut self,
        ctx: &mut RenderContext,
        textures: &mut TextureRegistry,
        desc: &MaterialDesc,
    ) -> MaterialResult<Arc<Material>> {
        let key = desc.key();
        if let Some(material) = self.materials.get(&key) {
            return Ok(Arc::clone(material));
        }

        let material = match desc {
            MaterialDesc::Lambertian(albedo) => Material::Lambertian {
                albedo: textures.bind(ctx, albedo)?,
            },
            MaterialDesc::Metal { albedo, fuzz } => Material::Metal {
                albedo: textures.bind(ctx, albedo)?,
                fuzz: *fuzz,
            },
            MaterialDesc::Dielectric { ref_idx } => Material::Dielectric { ref_idx: *ref_idx },
            MaterialDesc::DiffuseLight(emit) => Material::DiffuseLight {
                emit: textures.bind(ctx, emit)?,
            },
        };

        let material = Arc::new(material);
        self.materials.insert(key, Arc::clone(&material));
        Ok(material)
    }

    /// Bind a material to one primitive slot.
    ///
    /// Creates the closest-hit program for this slot; nothing else is mutated.
    pub fn bind(&mut self, ctx: &mut RenderContext, material: &Arc<Material>) -> MaterialResult<ShadingBinding> {
        let closest_hit = ctx.create_program(material.program_set(), "closest_hit")?;

        let params = match material.as_ref() {
            Material::Metal { fuzz, .. } => ShadingParams {
                fuzz: effective_fuzz(*fuzz),
                ref_idx: 0.0,
            },
            Material::Dielectric { ref_idx } => ShadingParams {
                fuzz: 0.0,
                ref_idx: *ref_idx,
            },
            _ => ShadingParams::default(),
        };

        self.bindings += 1;
        Ok(ShadingBinding {
            material: Arc::clone(material),
            closest_hit,
            textures: material.textures(),
            params,
            brdf: material.brdf(),
        })
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Number of bindings handed out so far.
    pub fn binding_count(&self) -> usize {
        self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (RenderContext, TextureRegistry, MaterialRegistry) {
        (RenderContext::standard(), TextureRegistry::new(), MaterialRegistry::new())
    }

    #[test]
    fn test_metal_fuzz_clamped_at_bind() {
        let (mut ctx, mut textures, mut materials) = setup();

        let rough = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::metal(0.7, 0.6, 0.5, 1.5))
            .unwrap();
        // Stored as given
        assert!(matches!(rough.as_ref(), Material::Metal { fuzz, .. } if *fuzz == 1.5));
        assert_eq!(materials.bind(&mut ctx, &rough).unwrap().params.fuzz, 1.0);

        let smooth = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::metal(0.7, 0.6, 0.5, 0.3))
            .unwrap();
        assert_eq!(materials.bind(&mut ctx, &smooth).unwrap().params.fuzz, 0.3);
    }

    #[test]
    fn test_effective_fuzz_edges() {
        assert_eq!(effective_fuzz(1.0), 1.0);
        assert_eq!(effective_fuzz(-0.5), 0.0);
        assert_eq!(effective_fuzz(f32::NAN), 1.0);
    }

    #[test]
    fn test_texture_table_sizes() {
        let (mut ctx, mut textures, mut materials) = setup();

        let cases = [
            (MaterialDesc::lambertian(0.5, 0.5, 0.5), 1),
            (MaterialDesc::metal(0.5, 0.5, 0.5, 0.0), 1),
            (MaterialDesc::diffuse_light(4.0, 4.0, 4.0), 1),
            (MaterialDesc::dielectric(1.5), 0),
        ];
        for (desc, expected) in cases {
            let material = materials.material(&mut ctx, &mut textures, &desc).unwrap();
            let binding = materials.bind(&mut ctx, &material).unwrap();
            assert_eq!(binding.textures.len(), expected, "{}", material.kind_name());
            assert_eq!(binding.texture_program().is_null(), expected == 0);
            assert_eq!(
                ctx.program(binding.closest_hit).unwrap().set,
                material.program_set()
            );
        }
    }

    #[test]
    fn test_materials_are_shared_per_description() {
        let (mut ctx, mut textures, mut materials) = setup();

        let a = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::lambertian(0.1, 0.2, 0.3))
            .unwrap();
        let b = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::lambertian(0.1, 0.2, 0.3))
            .unwrap();
        let glass = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::dielectric(1.5))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(materials.len(), 2);
        assert_eq!(textures.len(), 1);

        // Each binding gets its own closest-hit program
        let first = materials.bind(&mut ctx, &a).unwrap();
        let second = materials.bind(&mut ctx, &a).unwrap();
        assert_ne!(first.closest_hit, second.closest_hit);
        assert_eq!(first.texture_program(), second.texture_program());
        assert_eq!(materials.bind(&mut ctx, &glass).unwrap().params.ref_idx, 1.5);
        assert_eq!(materials.binding_count(), 3);
    }

    #[test]
    fn test_emission() {
        let (mut ctx, mut textures, mut materials) = setup();
        let light = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::diffuse_light(15.0, 15.0, 15.0))
            .unwrap();

        assert!(light.is_emissive());
        assert_eq!(light.brdf(), None);
        assert_eq!(light.emitted(0.5, 0.5, Vec3::ZERO), Color::splat(15.0));
        assert_eq!(light.albedo(0.5, 0.5, Vec3::ZERO), Color::ZERO);
    }
}
