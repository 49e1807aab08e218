//! Light table: emissive primitives found in a scene graph.

use std::sync::Arc;

use lumen_math::{Color, Mat4, Vec3};
use rand::RngCore;

use crate::error::{SamplingError, SamplingResult};
use crate::group::SceneGroup;
use crate::primitive::Primitive;
use crate::shape::ShapeKind;

/// One sampleable light.
#[derive(Debug, Clone)]
pub struct LightEntry {
    pub primitive: Arc<Primitive>,
    /// Local-to-world matrix accumulated through instances
    pub transform: Mat4,
    pub emission: Color,
}

impl LightEntry {
    /// Solid-angle density of sampling world direction `direction` from `origin`.
    ///
    /// Exact for rigid transforms; scaled instances are sampled in local space.
    pub fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        let inverse = self.transform.inverse();
        self.primitive
            .geometry()
            .pdf_value(inverse.transform_point3(origin), inverse.transform_vector3(direction))
    }

    /// World direction from `origin` toward a random point on the light.
    pub fn random_direction(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let local_origin = self.transform.inverse().transform_point3(origin);
        let local = self.primitive.geometry().random_direction(local_origin, rng);
        self.transform.transform_vector3(local)
    }
}

/// Emissive primitives in depth-first scene order.
#[derive(Debug, Clone, Default)]
pub struct LightTable {
    entries: Vec<LightEntry>,
}

impl LightTable {
    /// Collect every primitive bound to an emitting material.
    ///
    /// Only rectangles and spheres can be sampled; any other emissive shape
    /// is an error.
    pub fn scan(group: &SceneGroup) -> SamplingResult<Self> {
        let mut entries = Vec::new();
        let mut unsupported = None;

        group.visit_primitives(|prim, transform| {
            if unsupported.is_some() || !prim.is_emissive() {
                return;
            }
            if !matches!(prim.kind(), ShapeKind::Sphere | ShapeKind::Rect(_)) {
                unsupported = Some(prim.kind());
                return;
            }

            let center = transform.transform_point3(prim.geometry().centroid());
            let emission = prim
                .bindings()
                .iter()
                .find(|b| b.is_emissive())
                .map(|b| b.material.emitted(0.5, 0.5, center))
                .unwrap_or(Color::ZERO);
            entries.push(LightEntry {
                primitive: Arc::clone(prim),
                transform: *transform,
                emission,
            });
        });

        if let Some(kind) = unsupported {
            return Err(SamplingError::UnsupportedLight(kind));
        }
        log::debug!("Light table: {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LightEntry] {
        &self.entries
    }

    /// Emission per light; index i matches `entries()[i]`.
    pub fn emissions(&self) -> Vec<Color> {
        self.entries.iter().map(|e| e.emission).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;
    use crate::group::{Acceleration, GroupBuilder, Transform};
    use lumen_core::{MaterialDesc, RenderContext};
    use lumen_math::Axis;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_scan_finds_emitters_in_order() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let white = builder.material(&MaterialDesc::lambertian(0.73, 0.73, 0.73)).unwrap();
        let light = builder.material(&MaterialDesc::diffuse_light(15.0, 15.0, 15.0)).unwrap();
        let dim = builder.material(&MaterialDesc::diffuse_light(2.0, 2.0, 2.0)).unwrap();

        let mut group = GroupBuilder::new(Acceleration::Bvh);
        group.add_primitive(builder.sphere(Vec3::ZERO, 1.0, &white).unwrap());
        group.add_primitive(builder.y_rect(213.0, 343.0, 227.0, 332.0, 554.0, false, &light).unwrap());
        group.add_primitive(builder.sphere(Vec3::new(0.0, 10.0, 0.0), 1.0, &dim).unwrap());
        let group = group.build();

        let table = LightTable::scan(&group).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].primitive.kind(), ShapeKind::Rect(Axis::Y));
        assert_eq!(table.entries()[1].primitive.kind(), ShapeKind::Sphere);
        assert_eq!(table.emissions(), vec![Color::splat(15.0), Color::splat(2.0)]);
    }

    #[test]
    fn test_emissive_triangle_is_rejected() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let light = builder.material(&MaterialDesc::diffuse_light(4.0, 4.0, 4.0)).unwrap();

        let mut group = GroupBuilder::new(Acceleration::Bvh);
        group.add_primitive(
            builder
                .triangle([Vec3::ZERO, Vec3::X, Vec3::Y], [Default::default(); 3], &light)
                .unwrap(),
        );
        let group = group.build();

        assert!(matches!(
            LightTable::scan(&group),
            Err(SamplingError::UnsupportedLight(ShapeKind::Triangle))
        ));
    }

    #[test]
    fn test_instanced_light_samples_in_world_space() {
        let mut ctx = RenderContext::standard();
        let mut builder = SceneBuilder::new(&mut ctx);
        let light = builder.material(&MaterialDesc::diffuse_light(4.0, 4.0, 4.0)).unwrap();

        let mut inner = GroupBuilder::new(Acceleration::Bvh);
        inner.add_primitive(builder.sphere(Vec3::ZERO, 1.0, &light).unwrap());
        let mut outer = GroupBuilder::new(Acceleration::Bvh);
        outer
            .add_transformed(inner.build(), Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)))
            .unwrap();
        let outer = outer.build();

        let table = LightTable::scan(&outer).unwrap();
        let entry = &table.entries()[0];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let dir = entry.random_direction(Vec3::ZERO, &mut rng);
            assert!(dir.y > 0.0);
            assert!(entry.pdf_value(Vec3::ZERO, dir) > 0.0);
        }
    }
}
