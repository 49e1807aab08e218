//! Primitives: a shape, its device programs, and its material bindings.

use std::fmt;

use lumen_core::{Buffer, ProgramId, RenderContext, ShadingBinding};
use lumen_math::{Aabb, Interval, Ray};

use crate::error::{BuildError, BuildResult};
use crate::hittable::{HitRecord, Hittable};
use crate::shape::{Shape, ShapeKind};

/// Bounding-volume and intersection programs of one primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryPrograms {
    pub bounds: ProgramId,
    pub intersect: ProgramId,
}

/// One geometric object with its material slots.
pub struct Primitive {
    kind: ShapeKind,
    geometry: Box<dyn Shape>,
    programs: GeometryPrograms,
    bindings: Vec<ShadingBinding>,
    texture_table: Buffer<ProgramId>,
    single_material: bool,
}

impl Primitive {
    /// Locate the shape's programs and attach `bindings`, one per material slot.
    pub fn new(ctx: &mut RenderContext, geometry: Box<dyn Shape>, bindings: Vec<ShadingBinding>) -> BuildResult<Self> {
        let single_material = bindings.len() == 1;
        Self::with_single_material(ctx, geometry, bindings, single_material)
    }

    /// Like [`Primitive::new`], with the single-material flag given by the
    /// caller. Meshes set it from their material source, not the slot count:
    /// a mesh whose only material comes from its MTL file still shades per face.
    pub fn with_single_material(
        ctx: &mut RenderContext,
        geometry: Box<dyn Shape>,
        bindings: Vec<ShadingBinding>,
        single_material: bool,
    ) -> BuildResult<Self> {
        if bindings.is_empty() {
            return Err(BuildError::NoMaterial);
        }
        let slots = geometry.material_slots();
        if slots > bindings.len() {
            return Err(BuildError::MaterialSlot {
                slot: (slots - 1) as u32,
                count: bindings.len(),
            });
        }

        let kind = geometry.kind();
        let programs = GeometryPrograms {
            bounds: ctx.create_program(kind.program_set(), &kind.bounds_entry())?,
            intersect: ctx.create_program(kind.program_set(), &kind.intersect_entry())?,
        };
        let table: Vec<ProgramId> = bindings.iter().map(ShadingBinding::texture_program).collect();
        let texture_table = ctx.buffer_from_slice("sample_texture", &table)?;

        Ok(Self {
            kind,
            geometry,
            programs,
            single_material,
            bindings,
            texture_table,
        })
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn geometry(&self) -> &dyn Shape {
        self.geometry.as_ref()
    }

    pub fn programs(&self) -> GeometryPrograms {
        self.programs
    }

    pub fn bindings(&self) -> &[ShadingBinding] {
        &self.bindings
    }

    /// Texture program per material slot, as the closest-hit programs read it.
    pub fn texture_table(&self) -> &Buffer<ProgramId> {
        &self.texture_table
    }

    pub fn single_material(&self) -> bool {
        self.single_material
    }

    /// True when any slot is bound to an emitting material.
    pub fn is_emissive(&self) -> bool {
        self.bindings.iter().any(ShadingBinding::is_emissive)
    }

    pub fn density(&self) -> Option<f32> {
        self.geometry.density()
    }

    pub fn sub_primitive_count(&self) -> usize {
        self.geometry.sub_primitive_count()
    }
}

impl Hittable for Primitive {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        if !self.geometry.hit(ray, ray_t, rec) {
            return false;
        }
        rec.primitive = Some(self);
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        self.geometry.bounding_box()
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("kind", &self.kind)
            .field("programs", &self.programs)
            .field("materials", &self.bindings.len())
            .field("sub_primitives", &self.sub_primitive_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::Sphere;
    use lumen_core::{MaterialDesc, MaterialRegistry, TextureRegistry};
    use lumen_math::Vec3;

    fn binding(ctx: &mut RenderContext, desc: &MaterialDesc) -> ShadingBinding {
        let mut textures = TextureRegistry::new();
        let mut materials = MaterialRegistry::new();
        let material = materials.material(ctx, &mut textures, desc).unwrap();
        materials.bind(ctx, &material).unwrap()
    }

    #[test]
    fn test_primitive_locates_programs() {
        let mut ctx = RenderContext::standard();
        let red = binding(&mut ctx, &MaterialDesc::lambertian(0.65, 0.05, 0.05));
        let sphere = Sphere::new(Vec3::ZERO, 1.0).unwrap();
        let prim = Primitive::new(&mut ctx, Box::new(sphere), vec![red]).unwrap();

        let bounds = ctx.program(prim.programs().bounds).unwrap();
        assert_eq!(bounds.set, "sphere");
        assert_eq!(bounds.entry, "get_bounds");
        assert_eq!(ctx.program(prim.programs().intersect).unwrap().entry, "hit_sphere");
        assert_eq!(prim.texture_table().len(), 1);
        assert!(!prim.texture_table()[0].is_null());
        assert!(prim.single_material());
    }

    #[test]
    fn test_primitive_requires_material() {
        let mut ctx = RenderContext::standard();
        let sphere = Sphere::new(Vec3::ZERO, 1.0).unwrap();
        let result = Primitive::new(&mut ctx, Box::new(sphere), Vec::new());
        assert!(matches!(result, Err(BuildError::NoMaterial)));
    }

    #[test]
    fn test_dielectric_slot_has_null_texture() {
        let mut ctx = RenderContext::standard();
        let glass = binding(&mut ctx, &MaterialDesc::dielectric(1.5));
        let sphere = Sphere::new(Vec3::ZERO, 1.0).unwrap();
        let prim = Primitive::new(&mut ctx, Box::new(sphere), vec![glass]).unwrap();
        assert!(prim.texture_table()[0].is_null());
    }

    #[test]
    fn test_hit_records_primitive_and_binding() {
        let mut ctx = RenderContext::standard();
        let light = binding(&mut ctx, &MaterialDesc::diffuse_light(4.0, 4.0, 4.0));
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0).unwrap();
        let prim = Primitive::new(&mut ctx, Box::new(sphere), vec![light]).unwrap();
        assert!(prim.is_emissive());

        let mut rec = HitRecord::default();
        assert!(prim.hit(&Ray::new_simple(Vec3::ZERO, -Vec3::Z), Interval::RAY, &mut rec));
        assert!(rec.binding().unwrap().is_emissive());
    }
}
