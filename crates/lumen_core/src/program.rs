//! Program sets: opaque device code blobs plus their named entry points.
//!
//! Scene assembly never looks inside a blob. It only needs to know that a
//! `(set, entry)` pair exists so it can hand out a callable reference to it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::context::{ContextError, ContextResult};

/// Program set names used by the scene assembly layer.
pub mod sets {
    pub const SPHERE: &str = "sphere";
    pub const MOVING_SPHERE: &str = "moving_sphere";
    pub const VOLUME_SPHERE: &str = "volume_sphere";
    pub const AARECT: &str = "aarect";
    pub const VOLUME_BOX: &str = "volume_box";
    pub const TRIANGLE: &str = "triangle";
    pub const MESH: &str = "mesh";
    pub const PLANE: &str = "plane";
    pub const LAMBERTIAN: &str = "lambertian";
    pub const METAL: &str = "metal";
    pub const DIELECTRIC: &str = "dielectric";
    pub const DIFFUSE_LIGHT: &str = "diffuse_light";
    pub const TEXTURES: &str = "textures";
    pub const MISS: &str = "miss";
    pub const EXCEPTION: &str = "exception";
    pub const RAYGEN: &str = "raygen";
}

/// One compiled unit of device code.
#[derive(Debug, Clone)]
pub struct ProgramSet {
    name: String,
    blob: Arc<[u8]>,
    entries: Vec<String>,
}

impl ProgramSet {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, blob: Vec<u8>, entries: &[S]) -> Self {
        Self {
            name: name.into(),
            blob: blob.into(),
            entries: entries.iter().map(|e| e.as_ref().to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn has_entry(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }
}

/// Registry of program sets, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct ProgramLibrary {
    sets: HashMap<String, ProgramSet>,
}

impl ProgramLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the manifest of every program set the scene layer binds to.
    ///
    /// Blobs start out empty; `load_blobs` attaches the compiled code.
    pub fn standard() -> Self {
        let per_axis = |prefixes: &[&str]| -> Vec<String> {
            prefixes
                .iter()
                .flat_map(|p| ["X", "Y", "Z"].map(|axis| format!("{p}_{axis}")))
                .collect()
        };
        let brdf = ["closest_hit", "BRDF_Sample", "BRDF_PDF", "BRDF_Evaluate", "scattering_pdf"];

        let mut library = Self::new();
        library.register(ProgramSet::new(
            sets::SPHERE,
            Vec::new(),
            &["get_bounds", "hit_sphere", "sample", "pdf"],
        ));
        library.register(ProgramSet::new(sets::MOVING_SPHERE, Vec::new(), &["get_bounds", "hit_sphere"]));
        library.register(ProgramSet::new(sets::VOLUME_SPHERE, Vec::new(), &["get_bounds", "hit_sphere"]));
        library.register(ProgramSet::new(
            sets::AARECT,
            Vec::new(),
            per_axis(&["get_bounds", "hit_rect", "sample", "pdf"]).as_slice(),
        ));
        library.register(ProgramSet::new(sets::VOLUME_BOX, Vec::new(), &["get_bounds", "hit_volume"]));
        library.register(ProgramSet::new(sets::TRIANGLE, Vec::new(), &["get_bounds", "hit_triangle"]));
        library.register(ProgramSet::new(sets::MESH, Vec::new(), &["mesh_bounds", "mesh_intersection"]));
        library.register(ProgramSet::new(sets::PLANE, Vec::new(), &["get_bounds", "hit_plane"]));
        library.register(ProgramSet::new(sets::LAMBERTIAN, Vec::new(), &brdf));
        library.register(ProgramSet::new(sets::METAL, Vec::new(), &brdf));
        library.register(ProgramSet::new(sets::DIELECTRIC, Vec::new(), &brdf));
        library.register(ProgramSet::new(sets::DIFFUSE_LIGHT, Vec::new(), &["closest_hit"]));
        library.register(ProgramSet::new(
            sets::TEXTURES,
            Vec::new(),
            &["constant_texture", "checker_texture", "image_texture", "hdr_texture"],
        ));
        library.register(ProgramSet::new(
            sets::MISS,
            Vec::new(),
            &["gradient_color", "constant_color", "image_background", "environmental_mapping"],
        ));
        library.register(ProgramSet::new(sets::EXCEPTION, Vec::new(), &["exception_program"]));
        library.register(ProgramSet::new(sets::RAYGEN, Vec::new(), &["renderPixel"]));
        library
    }

    /// Add or replace a program set.
    pub fn register(&mut self, set: ProgramSet) {
        self.sets.insert(set.name.clone(), set);
    }

    pub fn get(&self, name: &str) -> Option<&ProgramSet> {
        self.sets.get(name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Check that `entry` exists in `set`.
    pub fn locate(&self, set: &str, entry: &str) -> ContextResult<&ProgramSet> {
        let program_set = self
            .sets
            .get(set)
            .ok_or_else(|| ContextError::UnknownProgramSet(set.to_string()))?;
        if !program_set.has_entry(entry) {
            return Err(ContextError::UnknownEntryPoint {
                set: set.to_string(),
                entry: entry.to_string(),
            });
        }
        Ok(program_set)
    }

    /// Read `<dir>/<set>.ptx` for every registered set.
    pub fn load_blobs(&mut self, dir: &Path) -> ContextResult<()> {
        for set in self.sets.values_mut() {
            let path = dir.join(format!("{}.ptx", set.name));
            let bytes = std::fs::read(&path).map_err(|source| ContextError::BlobIo {
                path: path.clone(),
                source,
            })?;
            log::debug!("Loaded program set '{}' ({} bytes)", set.name, bytes.len());
            set.blob = bytes.into();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_locates_known_entries() {
        let library = ProgramLibrary::standard();

        assert!(library.locate(sets::SPHERE, "hit_sphere").is_ok());
        assert!(library.locate(sets::AARECT, "hit_rect_Y").is_ok());
        assert!(library.locate(sets::AARECT, "pdf_Z").is_ok());
        assert!(library.locate(sets::METAL, "BRDF_Evaluate").is_ok());
        assert!(library.locate(sets::MISS, "environmental_mapping").is_ok());
    }

    #[test]
    fn test_locate_reports_missing_pieces() {
        let library = ProgramLibrary::standard();

        assert!(matches!(
            library.locate("torus", "hit"),
            Err(ContextError::UnknownProgramSet(name)) if name == "torus"
        ));
        assert!(matches!(
            library.locate(sets::SPHERE, "hit_torus"),
            Err(ContextError::UnknownEntryPoint { .. })
        ));
    }

    #[test]
    fn test_load_blobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raygen.ptx"), b"// ptx").unwrap();

        let mut library = ProgramLibrary::new();
        library.register(ProgramSet::new(sets::RAYGEN, Vec::new(), &["renderPixel"]));
        library.load_blobs(dir.path()).unwrap();
        assert_eq!(library.get(sets::RAYGEN).unwrap().blob(), b"// ptx");

        library.register(ProgramSet::new(sets::MISS, Vec::new(), &["constant_color"]));
        assert!(matches!(
            library.load_blobs(dir.path()),
            Err(ContextError::BlobIo { .. })
        ));
    }
}
