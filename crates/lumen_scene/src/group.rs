//! Scene graph: groups of primitives, nested groups and transformed instances.
//!
//! A `GroupBuilder` collects children and is consumed by `build`, which
//! creates the group's acceleration structure. Built groups are immutable
//! and shared through `Arc`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lumen_math::{Aabb, Interval, Mat4, Mat4Ext, Quat, Ray, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bvh::Bvh;
use crate::error::{BuildError, BuildResult};
use crate::hittable::{HitRecord, Hittable};
use crate::primitive::Primitive;

/// Error returned when a string does not name an acceleration kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown acceleration '{0}', expected one of Bvh, Trbvh, NoAccel")]
pub struct AccelKindError(pub String);

/// Acceleration structure requested for a group.
///
/// `Bvh` and `Trbvh` both build the median-split BVH; `NoAccel` tests
/// children linearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Acceleration {
    #[default]
    Bvh,
    Trbvh,
    NoAccel,
}

impl Acceleration {
    pub fn name(self) -> &'static str {
        match self {
            Acceleration::Bvh => "Bvh",
            Acceleration::Trbvh => "Trbvh",
            Acceleration::NoAccel => "NoAccel",
        }
    }

    pub fn is_hierarchical(self) -> bool {
        !matches!(self, Acceleration::NoAccel)
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Acceleration {
    type Err = AccelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bvh" => Ok(Acceleration::Bvh),
            "trbvh" => Ok(Acceleration::Trbvh),
            "noaccel" => Ok(Acceleration::NoAccel),
            _ => Err(AccelKindError(s.to_string())),
        }
    }
}

/// Affine placement: scale, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Rotation about +Y in degrees.
    pub fn with_rotation_y_degrees(mut self, degrees: f32) -> Self {
        self.rotation = Quat::from_rotation_y(degrees.to_radians());
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A shared group placed in its parent's space by a transform.
#[derive(Debug, Clone)]
pub struct Instance {
    group: Arc<SceneGroup>,
    transform: Transform,
    matrix: Mat4,
    inverse: Mat4,
    bbox: Option<Aabb>,
}

impl Instance {
    /// Fails when the transform cannot be inverted, such as a zero scale.
    pub fn new(group: Arc<SceneGroup>, transform: Transform) -> BuildResult<Self> {
        let matrix = transform.to_matrix();
        let inverse = matrix.inverse();
        if matrix.determinant() == 0.0 || !matrix.is_finite() || !inverse.is_finite() {
            return Err(BuildError::SingularTransform { scale: transform.scale });
        }
        let bbox = group.bounding_box().map(|b| matrix.transform_aabb(&b));
        Ok(Self {
            group,
            transform,
            matrix,
            inverse,
            bbox,
        })
    }

    pub fn group(&self) -> &Arc<SceneGroup> {
        &self.group
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        // Local direction is not renormalized, so t is the same in both spaces
        let local_ray = ray.transformed(&self.inverse);
        if !self.group.hit(&local_ray, ray_t, rec) {
            return false;
        }
        rec.p = self.matrix.transform_point3(rec.p);
        rec.normal = self.matrix.transform_normal(rec.normal);
        rec.shading_normal = self.matrix.transform_normal(rec.shading_normal);
        true
    }

    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.group.occluded(&ray.transformed(&self.inverse), ray_t)
    }
}

/// A child of a scene group.
#[derive(Debug, Clone)]
pub enum Node {
    Primitive(Arc<Primitive>),
    Group(Arc<SceneGroup>),
    Instance(Instance),
}

impl Node {
    pub fn bounding_box(&self) -> Option<Aabb> {
        match self {
            Node::Primitive(prim) => prim.bounding_box(),
            Node::Group(group) => group.bounding_box(),
            Node::Instance(instance) => instance.bbox,
        }
    }

    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        match self {
            Node::Primitive(prim) => prim.hit(ray, ray_t, rec),
            Node::Group(group) => group.hit(ray, ray_t, rec),
            Node::Instance(instance) => instance.hit(ray, ray_t, rec),
        }
    }

    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        match self {
            Node::Primitive(prim) => {
                let mut scratch = HitRecord::default();
                prim.geometry().hit(ray, ray_t, &mut scratch)
            }
            Node::Group(group) => group.occluded(ray, ray_t),
            Node::Instance(instance) => instance.occluded(ray, ray_t),
        }
    }

    fn primitive_count(&self) -> usize {
        match self {
            Node::Primitive(_) => 1,
            Node::Group(group) => group.primitive_count(),
            Node::Instance(instance) => instance.group.primitive_count(),
        }
    }
}

impl From<Arc<Primitive>> for Node {
    fn from(prim: Arc<Primitive>) -> Self {
        Node::Primitive(prim)
    }
}

impl From<Instance> for Node {
    fn from(instance: Instance) -> Self {
        Node::Instance(instance)
    }
}

impl From<SceneGroup> for Node {
    fn from(group: SceneGroup) -> Self {
        Node::Group(Arc::new(group))
    }
}

impl From<Arc<SceneGroup>> for Node {
    fn from(group: Arc<SceneGroup>) -> Self {
        Node::Group(group)
    }
}

/// Mutable stage of a group. `build` consumes it.
#[derive(Debug, Default)]
pub struct GroupBuilder {
    accel: Acceleration,
    children: Vec<Node>,
}

impl GroupBuilder {
    pub fn new(accel: Acceleration) -> Self {
        Self {
            accel,
            children: Vec::new(),
        }
    }

    pub fn add(&mut self, node: impl Into<Node>) -> &mut Self {
        self.children.push(node.into());
        self
    }

    pub fn add_primitive(&mut self, prim: Arc<Primitive>) -> &mut Self {
        self.add(Node::Primitive(prim))
    }

    pub fn add_group(&mut self, group: impl Into<Arc<SceneGroup>>) -> &mut Self {
        self.add(Node::Group(group.into()))
    }

    pub fn add_transformed(
        &mut self,
        group: impl Into<Arc<SceneGroup>>,
        transform: Transform,
    ) -> BuildResult<&mut Self> {
        let instance = Instance::new(group.into(), transform)?;
        Ok(self.add(Node::Instance(instance)))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Finalize the group and build its acceleration structure.
    ///
    /// Children without finite bounds (planes, or groups containing them)
    /// are kept out of the hierarchy and tested linearly.
    pub fn build(self) -> SceneGroup {
        let mut bounded = Vec::new();
        let mut unbounded = Vec::new();
        let mut boxes = Vec::new();

        for (i, child) in self.children.iter().enumerate() {
            match child.bounding_box().filter(Aabb::is_finite) {
                Some(bbox) => {
                    bounded.push(i);
                    boxes.push(bbox);
                }
                None => unbounded.push(i),
            }
        }

        let bbox = if unbounded.is_empty() && !boxes.is_empty() {
            Some(boxes.iter().fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b)))
        } else {
            None
        };
        let bvh = self.accel.is_hierarchical().then(|| Bvh::build(&boxes));

        log::debug!(
            "Built {} group: {} children ({} unbounded)",
            self.accel,
            self.children.len(),
            unbounded.len()
        );

        SceneGroup {
            children: self.children,
            accel: self.accel,
            bvh,
            bounded,
            unbounded,
            bbox,
        }
    }
}

/// Immutable group of scene nodes with its acceleration structure.
#[derive(Debug, Clone)]
pub struct SceneGroup {
    children: Vec<Node>,
    accel: Acceleration,
    bvh: Option<Bvh>,
    /// Indices of children with finite bounds; the BVH indexes into this
    bounded: Vec<usize>,
    unbounded: Vec<usize>,
    bbox: Option<Aabb>,
}

impl SceneGroup {
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn acceleration(&self) -> Acceleration {
        self.accel
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of children kept out of the acceleration structure.
    pub fn unbounded_count(&self) -> usize {
        self.unbounded.len()
    }

    /// Primitives in this group and every nested group, instances included.
    pub fn primitive_count(&self) -> usize {
        self.children.iter().map(Node::primitive_count).sum()
    }

    /// Closest hit in world space of this group.
    pub fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        let mut hit_anything = false;
        let mut closest = ray_t.max;

        match &self.bvh {
            Some(bvh) => {
                hit_anything = bvh.nearest(ray, ray_t, |i, interval| {
                    let child = &self.children[self.bounded[i]];
                    child.hit(ray, interval, rec).then_some(rec.t)
                });
                if hit_anything {
                    closest = rec.t;
                }
            }
            None => {
                for &i in &self.bounded {
                    if self.children[i].hit(ray, Interval::new(ray_t.min, closest), rec) {
                        hit_anything = true;
                        closest = rec.t;
                    }
                }
            }
        }

        for &i in &self.unbounded {
            if self.children[i].hit(ray, Interval::new(ray_t.min, closest), rec) {
                hit_anything = true;
                closest = rec.t;
            }
        }
        hit_anything
    }

    /// True when anything blocks the ray inside `ray_t`.
    pub fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        let blocked = match &self.bvh {
            Some(bvh) => bvh.any(ray, ray_t, |i, interval| self.children[self.bounded[i]].occluded(ray, interval)),
            None => self.bounded.iter().any(|&i| self.children[i].occluded(ray, ray_t)),
        };
        blocked || self.unbounded.iter().any(|&i| self.children[i].occluded(ray, ray_t))
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bbox
    }

    /// Visit every primitive depth-first, in insertion order, with the
    /// accumulated local-to-world matrix.
    pub fn visit_primitives<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Primitive>, &Mat4),
    {
        self.visit_with(&Mat4::IDENTITY, &mut f);
    }

    fn visit_with(&self, parent: &Mat4, f: &mut dyn FnMut(&Arc<Primitive>, &Mat4)) {
        for child in &self.children {
            match child {
                Node::Primitive(prim) => f(prim, parent),
                Node::Group(group) => group.visit_with(parent, f),
                Node::Instance(instance) => {
                    let world = *parent * instance.matrix;
                    instance.group.visit_with(&world, f);
                }
            }
        }
    }
}

impl Hittable for SceneGroup {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        SceneGroup::hit(self, ray, ray_t, rec)
    }

    fn bounding_box(&self) -> Option<Aabb> {
        self.bbox
    }
}
