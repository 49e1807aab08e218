//! Geometry builder: shapes plus materials into bound primitives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_core::mesh::resolve_mesh_materials;
use lumen_core::{
    parse_obj, Material, MaterialDesc, MaterialRegistry, MeshBuffers, RenderContext, ShadingBinding, TextureRegistry,
};
use lumen_math::{Axis, Vec2, Vec3};
use rand::Rng;

use crate::error::{BuildError, BuildResult};
use crate::group::{Acceleration, GroupBuilder, Node, SceneGroup, Transform};
use crate::mesh::TriangleMesh;
use crate::plane::Plane;
use crate::primitive::Primitive;
use crate::rect::Rect;
use crate::shape::Shape;
use crate::sphere::{MovingSphere, Sphere};
use crate::triangle::Triangle;
use crate::volume::{VolumeBox, VolumeSphere};

/// Options for loading a mesh file.
#[derive(Debug, Clone)]
pub struct MeshOptions {
    /// Folder that texture paths in the material file are relative to
    pub assets_folder: PathBuf,
    /// Uniform scale applied to vertex positions
    pub scale: f32,
    /// Use this material for every face instead of the file's materials
    pub material: Option<Arc<Material>>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            assets_folder: PathBuf::from("."),
            scale: 1.0,
            material: None,
        }
    }
}

/// Builds primitives against one render context.
///
/// Owns the texture and material registries so that equal descriptions
/// share one material across the whole scene.
pub struct SceneBuilder<'a> {
    ctx: &'a mut RenderContext,
    textures: TextureRegistry,
    materials: MaterialRegistry,
    acceleration: Acceleration,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(ctx: &'a mut RenderContext) -> Self {
        Self {
            ctx,
            textures: TextureRegistry::new(),
            materials: MaterialRegistry::new(),
            acceleration: Acceleration::default(),
        }
    }

    /// Acceleration used for groups made with `group()`.
    pub fn with_acceleration(mut self, acceleration: Acceleration) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    /// Empty group using the builder's acceleration kind.
    pub fn group(&self) -> GroupBuilder {
        GroupBuilder::new(self.acceleration)
    }

    pub fn context(&mut self) -> &mut RenderContext {
        &mut *self.ctx
    }

    /// Context and texture registry together, for background wiring.
    pub fn parts(&mut self) -> (&mut RenderContext, &mut TextureRegistry) {
        (&mut *self.ctx, &mut self.textures)
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn material(&mut self, desc: &MaterialDesc) -> BuildResult<Arc<Material>> {
        Ok(self.materials.material(self.ctx, &mut self.textures, desc)?)
    }

    fn bind(&mut self, material: &Arc<Material>) -> BuildResult<ShadingBinding> {
        Ok(self.materials.bind(self.ctx, material)?)
    }

    /// Wrap any shape with a single material slot.
    pub fn primitive(&mut self, shape: impl Shape + 'static, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        let binding = self.bind(material)?;
        Ok(Arc::new(Primitive::new(self.ctx, Box::new(shape), vec![binding])?))
    }

    pub fn sphere(&mut self, center: Vec3, radius: f32, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        self.primitive(Sphere::new(center, radius)?, material)
    }

    pub fn moving_sphere(
        &mut self,
        center0: Vec3,
        center1: Vec3,
        time0: f32,
        time1: f32,
        radius: f32,
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.primitive(MovingSphere::new(center0, center1, time0, time1, radius)?, material)
    }

    pub fn volume_sphere(
        &mut self,
        center: Vec3,
        radius: f32,
        density: f32,
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.primitive(VolumeSphere::new(center, radius, density)?, material)
    }

    pub fn rect(&mut self, rect: Rect, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        self.primitive(rect, material)
    }

    /// Rectangle perpendicular to X spanning (y, z).
    #[allow(clippy::too_many_arguments)]
    pub fn x_rect(
        &mut self,
        y0: f32,
        y1: f32,
        z0: f32,
        z1: f32,
        x: f32,
        flip: bool,
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.axis_rect(Axis::X, [y0, y1, z0, z1, x], flip, material)
    }

    /// Rectangle perpendicular to Y spanning (x, z).
    #[allow(clippy::too_many_arguments)]
    pub fn y_rect(
        &mut self,
        x0: f32,
        x1: f32,
        z0: f32,
        z1: f32,
        y: f32,
        flip: bool,
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.axis_rect(Axis::Y, [x0, x1, z0, z1, y], flip, material)
    }

    /// Rectangle perpendicular to Z spanning (x, y).
    #[allow(clippy::too_many_arguments)]
    pub fn z_rect(
        &mut self,
        x0: f32,
        x1: f32,
        y0: f32,
        y1: f32,
        z: f32,
        flip: bool,
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.axis_rect(Axis::Z, [x0, x1, y0, y1, z], flip, material)
    }

    fn axis_rect(&mut self, axis: Axis, extent: [f32; 5], flip: bool, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        let [a0, a1, b0, b1, k] = extent;
        let mut rect = Rect::new(axis, a0, a1, b0, b1, k)?;
        rect.flip = flip;
        self.rect(rect, material)
    }

    pub fn volume_box(&mut self, p0: Vec3, p1: Vec3, density: f32, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        self.primitive(VolumeBox::new(p0, p1, density)?, material)
    }

    pub fn triangle(
        &mut self,
        vertices: [Vec3; 3],
        texcoords: [Vec2; 3],
        material: &Arc<Material>,
    ) -> BuildResult<Arc<Primitive>> {
        self.primitive(Triangle::with_texcoords(vertices, texcoords)?, material)
    }

    pub fn plane(&mut self, axis: Axis, offset: f32, invert: bool, material: &Arc<Material>) -> BuildResult<Arc<Primitive>> {
        self.primitive(Plane::new(axis, offset, invert)?, material)
    }

    /// Box between corners `p0` and `p1` as six rectangles sharing `material`.
    ///
    /// Each face gets its own binding; the faces live in their own group.
    pub fn box_group(&mut self, p0: Vec3, p1: Vec3, material: &Arc<Material>) -> BuildResult<SceneGroup> {
        if !p0.is_finite() || !p1.is_finite() {
            return Err(BuildError::NonFinite { shape: "box" });
        }
        if !p1.cmpgt(p0).all() {
            return Err(BuildError::DegenerateExtent { shape: "box" });
        }

        let faces = [
            Rect::z(p0.x, p1.x, p0.y, p1.y, p0.z)?.flipped(),
            Rect::z(p0.x, p1.x, p0.y, p1.y, p1.z)?,
            Rect::y(p0.x, p1.x, p0.z, p1.z, p0.y)?.flipped(),
            Rect::y(p0.x, p1.x, p0.z, p1.z, p1.y)?,
            Rect::x(p0.y, p1.y, p0.z, p1.z, p0.x)?.flipped(),
            Rect::x(p0.y, p1.y, p0.z, p1.z, p1.x)?,
        ];

        let mut group = GroupBuilder::new(Acceleration::Trbvh);
        for face in faces {
            group.add_primitive(self.rect(face, material)?);
        }
        Ok(group.build())
    }

    /// Box of `size` with its min corner at the origin, rotated about Y by
    /// `rotate_y_degrees` and then moved to `position`.
    pub fn transformed_box(
        &mut self,
        position: Vec3,
        size: Vec3,
        rotate_y_degrees: f32,
        material: &Arc<Material>,
    ) -> BuildResult<Node> {
        let group = self.box_group(Vec3::ZERO, size, material)?;
        let transform = Transform::from_translation(position).with_rotation_y_degrees(rotate_y_degrees);
        Ok(Node::Instance(crate::group::Instance::new(Arc::new(group), transform)?))
    }

    /// Load a mesh file as one primitive with one material slot per file material.
    ///
    /// The file is parsed and checked before anything is registered, so a
    /// broken file leaves the registries untouched.
    pub fn mesh<R: Rng + ?Sized>(
        &mut self,
        path: &Path,
        options: &MeshOptions,
        rng: &mut R,
    ) -> BuildResult<Arc<Primitive>> {
        let parsed = parse_obj(path)?;
        parsed.validate()?;

        let resolved = resolve_mesh_materials(
            self.ctx,
            &mut self.textures,
            &mut self.materials,
            &parsed,
            &options.assets_folder,
            options.material.as_ref(),
            rng,
        )?;
        let host = MeshBuffers::from_parsed(&parsed, options.scale, |name| resolved.slot(name))?;
        let device = host.upload(self.ctx)?;

        let single_material = resolved.single_material;
        let bindings = resolved
            .materials
            .iter()
            .map(|material| self.bind(material))
            .collect::<BuildResult<Vec<_>>>()?;

        let mesh = TriangleMesh::new(device);
        log::info!(
            "Loaded mesh {}: {} triangles, {} material slots",
            path.display(),
            mesh.triangle_count(),
            bindings.len()
        );
        Ok(Arc::new(Primitive::with_single_material(
            self.ctx,
            Box::new(mesh),
            bindings,
            single_material,
        )?))
    }
}
