//! Lumen Core - execution context, shading registries and mesh ingestion.
//!
//! This crate provides:
//!
//! - **Execution context**: `RenderContext`, program sets and write-once buffers
//! - **Texture Registry**: texture descriptions bound to callable texture programs
//! - **Material Registry**: shared materials and per-primitive shading bindings
//! - **Mesh Ingestion**: OBJ parsing and structure-of-arrays triangle buffers
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{MaterialDesc, MaterialRegistry, RenderContext, TextureRegistry};
//!
//! let mut ctx = RenderContext::standard();
//! let mut textures = TextureRegistry::new();
//! let mut materials = MaterialRegistry::new();
//!
//! let red = materials.material(&mut ctx, &mut textures, &MaterialDesc::lambertian(0.65, 0.05, 0.05))?;
//! let binding = materials.bind(&mut ctx, &red)?;
//! ```

pub mod brdf;
pub mod context;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod program;
pub mod texture;

// Re-export commonly used types
pub use brdf::{BrdfKind, ShadingParams};
pub use context::{
    Buffer, ContextConfig, ContextError, ContextResult, MappedBuffer, ProgramId, RenderContext,
};
pub use material::{Material, MaterialDesc, MaterialError, MaterialRegistry, ShadingBinding};
pub use mesh::{
    MeshBuffers, MeshDeviceBuffers, MeshError, MeshGroup, MeshMaterial, MeshResult, ParsedMesh,
    ResolvedMaterials,
};
pub use obj::parse_obj;
pub use program::{sets, ProgramLibrary, ProgramSet};
pub use texture::{
    EnvironmentMapping, Texture, TextureDesc, TextureError, TextureHandle, TextureRegistry,
};
