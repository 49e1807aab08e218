//! Mesh Ingestion.
//!
//! Turns a parsed polygon mesh into structure-of-arrays triangle buffers and
//! resolves per-face material names into material slots.
//!
//! Buffer layout, for triangle `i`:
//!
//! | array          | per triangle | offset |
//! |----------------|--------------|--------|
//! | `vertices`     | 3            | `3i`   |
//! | `normals`      | 3            | `3i`   |
//! | `texcoords`    | 3            | `3i`   |
//! | `edges`        | 2            | `2i`   |
//! | `material_ids` | 1            | `i`    |
//!
//! Triangles appear in face order; the intersection program relies on it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_math::{Aabb, Color, Vec2, Vec3};
use rand::Rng;
use thiserror::Error;

use crate::context::{Buffer, ContextError, ContextResult, RenderContext};
use crate::material::{Material, MaterialDesc, MaterialError, MaterialRegistry};
use crate::texture::{TextureDesc, TextureRegistry};

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("failed to parse mesh {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("mesh {} contains no triangles", .path.display())]
    NoGeometry { path: PathBuf },

    #[error("face index {index} in group {group} is out of range ({vertex_count} vertices)")]
    InvalidIndex {
        group: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type MeshResult<T> = Result<T, MeshError>;

/// One group of faces sharing a material, indices already triangulated.
#[derive(Debug, Clone, Default)]
pub struct MeshGroup {
    pub positions: Vec<Vec3>,
    /// Empty, or one per position
    pub texcoords: Vec<Vec2>,
    /// Empty, or one per position
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Option<String>,
}

impl MeshGroup {
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Material table entry of a mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMaterial {
    pub name: String,
    pub diffuse: Color,
    /// As written in the material file, relative to the assets folder
    pub diffuse_texture: Option<PathBuf>,
}

/// Output of the mesh parser.
#[derive(Debug, Clone, Default)]
pub struct ParsedMesh {
    pub groups: Vec<MeshGroup>,
    pub materials: Vec<MeshMaterial>,
}

impl ParsedMesh {
    pub fn face_count(&self) -> usize {
        self.groups.iter().map(MeshGroup::face_count).sum()
    }

    /// Check every face index against its group's vertex count.
    pub fn validate(&self) -> MeshResult<()> {
        for (group_index, group) in self.groups.iter().enumerate() {
            let vertex_count = group.positions.len();
            if let Some(&index) = group.indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::InvalidIndex {
                    group: group_index,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

/// Materials a mesh's faces can refer to.
#[derive(Debug, Clone)]
pub struct ResolvedMaterials {
    pub materials: Vec<Arc<Material>>,
    slots: HashMap<String, u32>,
    pub single_material: bool,
}

impl ResolvedMaterials {
    /// Every face uses `material`.
    pub fn single(material: Arc<Material>) -> Self {
        Self {
            materials: vec![material],
            slots: HashMap::new(),
            single_material: true,
        }
    }

    /// Slot for a face group's material name. Unknown names fall back to slot 0.
    pub fn slot(&self, name: Option<&str>) -> u32 {
        if self.single_material {
            return 0;
        }
        match name {
            Some(name) => self.slots.get(name).copied().unwrap_or_else(|| {
                log::warn!("Mesh face material '{}' is not defined, using slot 0", name);
                0
            }),
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Resolve the material table of a parsed mesh.
///
/// With an override every face uses it. Otherwise each file material becomes a
/// Lambertian: constant when it only has a diffuse color, image-textured when it
/// names a texture. A file without materials gets one random-color Lambertian.
pub fn resolve_mesh_materials<R: Rng + ?Sized>(
    ctx: &mut RenderContext,
    textures: &mut TextureRegistry,
    materials: &mut MaterialRegistry,
    parsed: &ParsedMesh,
    assets_folder: &Path,
    override_material: Option<&Arc<Material>>,
    rng: &mut R,
) -> MeshResult<ResolvedMaterials> {
    if let Some(material) = override_material {
        return Ok(ResolvedMaterials::single(Arc::clone(material)));
    }

    if parsed.materials.is_empty() {
        let color = Color::new(rng.gen(), rng.gen(), rng.gen());
        log::debug!("Mesh has no materials, using random Lambertian {:?}", color);
        let material = materials.material(ctx, textures, &MaterialDesc::Lambertian(TextureDesc::Constant(color)))?;
        return Ok(ResolvedMaterials::single(material));
    }

    let mut resolved = Vec::with_capacity(parsed.materials.len());
    let mut slots = HashMap::new();
    for mesh_material in &parsed.materials {
        let albedo = match &mesh_material.diffuse_texture {
            Some(path) => TextureDesc::Image(assets_folder.join(path)),
            None => TextureDesc::Constant(mesh_material.diffuse),
        };
        let material = materials.material(ctx, textures, &MaterialDesc::Lambertian(albedo))?;
        slots.insert(mesh_material.name.clone(), resolved.len() as u32);
        resolved.push(material);
    }

    Ok(ResolvedMaterials {
        materials: resolved,
        slots,
        single_material: false,
    })
}

/// One reconstructed triangle record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTriangle {
    pub vertices: [Vec3; 3],
    pub edges: [Vec3; 2],
    pub normals: [Vec3; 3],
    pub texcoords: [Vec2; 3],
    pub material: u32,
}

/// Host-side structure-of-arrays triangle data.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub material_ids: Vec<u32>,
}

impl MeshBuffers {
    /// Flatten every face of `parsed`, in order, scaling positions by `scale`.
    ///
    /// Missing UVs or normals are written as zero.
    pub fn from_parsed(parsed: &ParsedMesh, scale: f32, slot_of: impl Fn(Option<&str>) -> u32) -> MeshResult<Self> {
        parsed.validate()?;

        let faces = parsed.face_count();
        let mut buffers = Self {
            vertices: Vec::with_capacity(3 * faces),
            edges: Vec::with_capacity(2 * faces),
            normals: Vec::with_capacity(3 * faces),
            texcoords: Vec::with_capacity(3 * faces),
            material_ids: Vec::with_capacity(faces),
        };

        for group in &parsed.groups {
            let slot = slot_of(group.material.as_deref());
            let vertex_count = group.positions.len();
            let has_uvs = group.texcoords.len() == vertex_count;
            let has_normals = group.normals.len() == vertex_count;

            for face in group.indices.chunks_exact(3) {
                let corners = [face[0], face[1], face[2]].map(|i| i as usize);
                let [a, b, c] = corners.map(|i| group.positions[i] * scale);
                buffers.vertices.extend([a, b, c]);
                buffers.edges.extend([b - a, c - a]);
                buffers.normals.extend(corners.map(|i| {
                    if has_normals {
                        group.normals[i]
                    } else {
                        Vec3::ZERO
                    }
                }));
                buffers.texcoords.extend(corners.map(|i| {
                    if has_uvs {
                        group.texcoords[i]
                    } else {
                        Vec2::ZERO
                    }
                }));
                buffers.material_ids.push(slot);
            }
        }

        Ok(buffers)
    }

    pub fn triangle_count(&self) -> usize {
        self.material_ids.len()
    }

    /// Triangle `i`, read back from the parallel arrays.
    pub fn triangle(&self, i: usize) -> Option<MeshTriangle> {
        triangle_from(
            &self.vertices,
            &self.edges,
            &self.normals,
            &self.texcoords,
            &self.material_ids,
            i,
        )
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::enclosing(self.vertices.iter().copied())
    }

    /// Copy into sealed device buffers.
    pub fn upload(&self, ctx: &mut RenderContext) -> ContextResult<MeshDeviceBuffers> {
        Ok(MeshDeviceBuffers {
            vertices: ctx.buffer_from_slice("vertex_buffer", &self.vertices)?,
            edges: ctx.buffer_from_slice("e_buffer", &self.edges)?,
            normals: ctx.buffer_from_slice("normal_buffer", &self.normals)?,
            texcoords: ctx.buffer_from_slice("texcoord_buffer", &self.texcoords)?,
            material_ids: ctx.buffer_from_slice("material_id_buffer", &self.material_ids)?,
        })
    }
}

/// Sealed mesh buffers as the intersection program reads them.
#[derive(Debug, Clone)]
pub struct MeshDeviceBuffers {
    pub vertices: Buffer<Vec3>,
    pub edges: Buffer<Vec3>,
    pub normals: Buffer<Vec3>,
    pub texcoords: Buffer<Vec2>,
    pub material_ids: Buffer<u32>,
}

impl MeshDeviceBuffers {
    pub fn triangle_count(&self) -> usize {
        self.material_ids.len()
    }

    pub fn triangle(&self, i: usize) -> Option<MeshTriangle> {
        triangle_from(
            &self.vertices,
            &self.edges,
            &self.normals,
            &self.texcoords,
            &self.material_ids,
            i,
        )
    }
}

fn triangle_from(
    vertices: &[Vec3],
    edges: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec2],
    material_ids: &[u32],
    i: usize,
) -> Option<MeshTriangle> {
    let material = *material_ids.get(i)?;
    let three = |data: &[Vec3]| -> Option<[Vec3; 3]> { data.get(3 * i..3 * i + 3)?.try_into().ok() };

    Some(MeshTriangle {
        vertices: three(vertices)?,
        edges: edges.get(2 * i..2 * i + 2)?.try_into().ok()?,
        normals: three(normals)?,
        texcoords: texcoords.get(3 * i..3 * i + 3)?.try_into().ok()?,
        material,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quad_group(material: Option<&str>) -> MeshGroup {
        MeshGroup {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            texcoords: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            normals: vec![Vec3::Z; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            material: material.map(str::to_string),
        }
    }

    fn random_parsed(rng: &mut StdRng, groups: usize) -> ParsedMesh {
        let mut parsed = ParsedMesh::default();
        for g in 0..groups {
            let vertex_count = rng.gen_range(3..20);
            let positions = (0..vertex_count)
                .map(|_| Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)))
                .collect();
            let texcoords = (0..vertex_count).map(|_| Vec2::new(rng.gen(), rng.gen())).collect();
            let indices = (0..3 * rng.gen_range(1..30)).map(|_| rng.gen_range(0..vertex_count as u32)).collect();
            parsed.groups.push(MeshGroup {
                positions,
                texcoords,
                normals: Vec::new(),
                indices,
                material: Some(format!("m{}", g % 2)),
            });
        }
        parsed
    }

    #[test]
    fn test_buffers_round_trip_faces() {
        let mut rng = StdRng::seed_from_u64(42);
        let parsed = random_parsed(&mut rng, 3);
        let scale = 2.5;
        let buffers = MeshBuffers::from_parsed(&parsed, scale, |_| 0).unwrap();

        let index_count: usize = parsed.groups.iter().map(|g| g.indices.len()).sum();
        assert_eq!(buffers.triangle_count(), index_count / 3);
        assert_eq!(buffers.vertices.len(), 3 * buffers.triangle_count());
        assert_eq!(buffers.edges.len(), 2 * buffers.triangle_count());

        let mut i = 0;
        for group in &parsed.groups {
            for face in group.indices.chunks_exact(3) {
                let tri = buffers.triangle(i).unwrap();
                let [a, b, c] = [0, 1, 2].map(|k| group.positions[face[k] as usize] * scale);
                assert_eq!(tri.vertices, [a, b, c]);
                assert_eq!(tri.edges, [b - a, c - a]);
                assert_eq!(tri.texcoords[2], group.texcoords[face[2] as usize]);
                assert_eq!(tri.normals, [Vec3::ZERO; 3]);
                i += 1;
            }
        }
        assert!(buffers.triangle(i).is_none());
    }

    #[test]
    fn test_device_buffers_match_host() {
        let parsed = ParsedMesh {
            groups: vec![quad_group(None)],
            materials: Vec::new(),
        };
        let buffers = MeshBuffers::from_parsed(&parsed, 1.0, |_| 0).unwrap();
        let mut ctx = RenderContext::standard();
        let device = buffers.upload(&mut ctx).unwrap();

        assert_eq!(device.triangle_count(), 2);
        assert_eq!(device.triangle(1), buffers.triangle(1));
        assert!(ctx.allocated_bytes() > 0);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut group = quad_group(None);
        group.indices.extend([0, 1, 9]);
        let parsed = ParsedMesh {
            groups: vec![group],
            materials: Vec::new(),
        };

        let err = MeshBuffers::from_parsed(&parsed, 1.0, |_| 0).unwrap_err();
        assert!(matches!(err, MeshError::InvalidIndex { index: 9, .. }));
    }

    #[test]
    fn test_diffuse_only_material_is_constant_lambertian() {
        let mut ctx = RenderContext::standard();
        let mut textures = TextureRegistry::new();
        let mut materials = MaterialRegistry::new();
        let mut rng = StdRng::seed_from_u64(0);

        let parsed = ParsedMesh {
            groups: vec![quad_group(Some("red"))],
            materials: vec![MeshMaterial {
                name: "red".to_string(),
                diffuse: Color::new(0.8, 0.1, 0.05),
                diffuse_texture: None,
            }],
        };
        let resolved = resolve_mesh_materials(
            &mut ctx,
            &mut textures,
            &mut materials,
            &parsed,
            Path::new("assets"),
            None,
            &mut rng,
        )
        .unwrap();

        assert_eq!(resolved.len(), 1);
        assert!(!resolved.single_material);
        match resolved.materials[0].as_ref() {
            Material::Lambertian { albedo } => {
                assert_eq!(albedo.value(0.3, 0.7, Vec3::ONE), Color::new(0.8, 0.1, 0.05));
                assert_eq!(ctx.program(albedo.program()).unwrap().entry, "constant_texture");
            }
            other => panic!("expected Lambertian, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_no_materials_gives_one_random_lambertian() {
        let mut ctx = RenderContext::standard();
        let mut textures = TextureRegistry::new();
        let mut materials = MaterialRegistry::new();

        let parsed = ParsedMesh {
            groups: vec![quad_group(None), quad_group(Some("ghost"))],
            materials: Vec::new(),
        };
        let resolve = |ctx: &mut RenderContext, textures: &mut TextureRegistry, materials: &mut MaterialRegistry, seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            resolve_mesh_materials(ctx, textures, materials, &parsed, Path::new("."), None, &mut rng).unwrap()
        };

        let resolved = resolve(&mut ctx, &mut textures, &mut materials, 11);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.single_material);

        let buffers = MeshBuffers::from_parsed(&parsed, 1.0, |name| resolved.slot(name)).unwrap();
        assert!(buffers.material_ids.iter().all(|&id| id == 0));

        // Same seed, same color
        let again = resolve(&mut ctx, &mut textures, &mut materials, 11);
        assert!(Arc::ptr_eq(&resolved.materials[0], &again.materials[0]));
    }

    #[test]
    fn test_material_slots_follow_face_groups() {
        let mut ctx = RenderContext::standard();
        let mut textures = TextureRegistry::new();
        let mut materials = MaterialRegistry::new();
        let mut rng = StdRng::seed_from_u64(0);

        let parsed = ParsedMesh {
            groups: vec![quad_group(Some("b")), quad_group(Some("a")), quad_group(Some("missing"))],
            materials: vec![
                MeshMaterial {
                    name: "a".to_string(),
                    diffuse: Color::X,
                    diffuse_texture: None,
                },
                MeshMaterial {
                    name: "b".to_string(),
                    diffuse: Color::Y,
                    diffuse_texture: None,
                },
            ],
        };
        let resolved = resolve_mesh_materials(
            &mut ctx,
            &mut textures,
            &mut materials,
            &parsed,
            Path::new("."),
            None,
            &mut rng,
        )
        .unwrap();
        let buffers = MeshBuffers::from_parsed(&parsed, 1.0, |name| resolved.slot(name)).unwrap();

        assert_eq!(buffers.material_ids, vec![1, 1, 0, 0, 0, 0]);
        assert!(buffers
            .material_ids
            .iter()
            .all(|&id| (id as usize) < resolved.len()));
    }

    #[test]
    fn test_override_material_wins() {
        let mut ctx = RenderContext::standard();
        let mut textures = TextureRegistry::new();
        let mut materials = MaterialRegistry::new();
        let mut rng = StdRng::seed_from_u64(0);
        let glass = materials
            .material(&mut ctx, &mut textures, &MaterialDesc::dielectric(1.5))
            .unwrap();

        let parsed = ParsedMesh {
            groups: vec![quad_group(Some("a"))],
            materials: vec![MeshMaterial {
                name: "a".to_string(),
                diffuse: Color::X,
                diffuse_texture: None,
            }],
        };
        let resolved = resolve_mesh_materials(
            &mut ctx,
            &mut textures,
            &mut materials,
            &parsed,
            Path::new("."),
            Some(&glass),
            &mut rng,
        )
        .unwrap();

        assert!(resolved.single_material);
        assert!(Arc::ptr_eq(&resolved.materials[0], &glass));
        assert_eq!(resolved.slot(Some("a")), 0);
    }
}
