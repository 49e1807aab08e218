//! Build configuration loaded from JSON.

use std::path::{Path, PathBuf};

use lumen_core::ContextConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::group::Acceleration;

/// Knobs for one scene build.
///
/// Every field is optional in the JSON file; missing fields take the
/// default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub width: u32,
    pub height: u32,
    /// Seed for every random choice made while building
    pub seed: u64,
    /// Folder that mesh texture paths are relative to
    pub assets_dir: PathBuf,
    /// Mesh file for scenes that load one
    pub mesh: Option<PathBuf>,
    /// Uniform scale applied to mesh vertices
    pub mesh_scale: f32,
    /// Accelerator for the top-level group
    pub acceleration: Acceleration,
    /// Byte limit for context buffers; unlimited when absent
    pub memory_budget: Option<usize>,
    /// Folder holding compiled `<set>.ptx` program blobs
    pub program_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            seed: 0,
            assets_dir: PathBuf::from("assets"),
            mesh: None,
            mesh_scale: 1.0,
            acceleration: Acceleration::Bvh,
            memory_budget: None,
            program_dir: None,
        }
    }
}

impl BuildConfig {
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded build config from {}", path.display());
        Ok(config)
    }

    /// Settings for the render context.
    pub fn context_config(&self) -> ContextConfig {
        match self.memory_budget {
            Some(memory_budget) => ContextConfig { memory_budget },
            None => ContextConfig::default(),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}
