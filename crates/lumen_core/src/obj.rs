//! Wavefront OBJ/MTL reading via `tobj`.

use std::path::{Path, PathBuf};

use lumen_math::{Color, Vec2, Vec3};

use crate::mesh::{MeshError, MeshGroup, MeshMaterial, MeshResult, ParsedMesh};

/// Kd used when a material entry has no diffuse color.
const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];

/// Parse an OBJ file (and its material library, if any) into face groups.
///
/// Polygons are triangulated and attributes are re-indexed so that positions,
/// UVs and normals share one index stream. A missing or broken material
/// library is logged and treated as "no materials".
pub fn parse_obj(path: &Path) -> MeshResult<ParsedMesh> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .map_err(|source| MeshError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("No material library for {}: {}", path.display(), err);
        Vec::new()
    });

    let groups: Vec<MeshGroup> = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            MeshGroup {
                positions: mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect(),
                texcoords: mesh.texcoords.chunks_exact(2).map(Vec2::from_slice).collect(),
                normals: mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect(),
                indices: mesh.indices,
                material: mesh
                    .material_id
                    .and_then(|id| materials.get(id))
                    .map(|m| m.name.clone()),
            }
        })
        .collect();

    let parsed = ParsedMesh {
        groups,
        materials: materials
            .iter()
            .map(|m| MeshMaterial {
                name: m.name.clone(),
                diffuse: Color::from_array(m.diffuse.unwrap_or(DEFAULT_DIFFUSE)),
                diffuse_texture: m
                    .diffuse_texture
                    .as_ref()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            })
            .collect(),
    };

    if parsed.face_count() == 0 {
        return Err(MeshError::NoGeometry {
            path: path.to_path_buf(),
        });
    }

    log::debug!(
        "Parsed {}: {} groups, {} faces, {} materials",
        path.display(),
        parsed.groups.len(),
        parsed.face_count(),
        parsed.materials.len()
    );
    Ok(parsed)
}
