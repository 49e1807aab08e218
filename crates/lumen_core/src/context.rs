//! Host-side execution context.
//!
//! Stands in for the device runtime during scene assembly: it resolves
//! `(program set, entry)` names to callable program ids, allocates write-once
//! buffers, and remembers which ray-generation, miss and exception programs
//! are installed.

use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::program::ProgramLibrary;

/// Errors raised by the execution context (resource errors).
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("unknown program set '{0}'")]
    UnknownProgramSet(String),

    #[error("program set '{set}' has no entry point '{entry}'")]
    UnknownEntryPoint { set: String, entry: String },

    #[error("buffer '{label}' needs {requested} bytes but only {available} remain in the memory budget")]
    OutOfMemory {
        label: String,
        requested: usize,
        available: usize,
    },

    #[error("failed to read program blob {}: {source}", .path.display())]
    BlobIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ContextResult<T> = Result<T, ContextError>;

/// Reference to a callable device program. `ProgramId::NULL` marks an empty slot.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ProgramId(u32);

impl ProgramId {
    pub const NULL: ProgramId = ProgramId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

/// What a program id was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRecord {
    pub set: String,
    pub entry: String,
}

/// Context settings.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Upper bound on bytes handed out through buffers
    pub memory_budget: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            memory_budget: usize::MAX,
        }
    }
}

/// Programs installed as the single entry point of a launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstalledPrograms {
    pub ray_generation: Option<ProgramId>,
    pub miss: Option<ProgramId>,
    pub exception: Option<ProgramId>,
}

/// The rendering context that every builder threads through.
#[derive(Debug)]
pub struct RenderContext {
    library: ProgramLibrary,
    config: ContextConfig,
    programs: Vec<ProgramRecord>,
    allocated_bytes: usize,
    next_buffer: u32,
    installed: InstalledPrograms,
}

impl RenderContext {
    pub fn new(library: ProgramLibrary, config: ContextConfig) -> Self {
        Self {
            library,
            config,
            programs: Vec::new(),
            allocated_bytes: 0,
            next_buffer: 0,
            installed: InstalledPrograms::default(),
        }
    }

    /// Context over the standard program manifest with no memory limit.
    pub fn standard() -> Self {
        Self::new(ProgramLibrary::standard(), ContextConfig::default())
    }

    pub fn library(&self) -> &ProgramLibrary {
        &self.library
    }

    /// Create a callable reference to `entry` in program set `set`.
    ///
    /// Every call yields a fresh id, one per program instance.
    pub fn create_program(&mut self, set: &str, entry: &str) -> ContextResult<ProgramId> {
        self.library.locate(set, entry)?;
        self.programs.push(ProgramRecord {
            set: set.to_string(),
            entry: entry.to_string(),
        });
        // Ids start at 1; 0 is the null program
        let id = ProgramId(self.programs.len() as u32);
        log::trace!("Created {} from {}::{}", id, set, entry);
        Ok(id)
    }

    /// Look up which program an id refers to.
    pub fn program(&self, id: ProgramId) -> Option<&ProgramRecord> {
        if id.is_null() {
            return None;
        }
        self.programs.get(id.0 as usize - 1)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Allocate a zeroed buffer mapped for host writes.
    pub fn create_buffer<T: Pod>(&mut self, label: &str, len: usize) -> ContextResult<MappedBuffer<T>> {
        let requested = len.saturating_mul(std::mem::size_of::<T>());
        let available = self.config.memory_budget.saturating_sub(self.allocated_bytes);
        if requested > available {
            return Err(ContextError::OutOfMemory {
                label: label.to_string(),
                requested,
                available,
            });
        }
        self.allocated_bytes += requested;

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        log::trace!("Mapped buffer '{}' ({} elements, {} bytes)", label, len, requested);

        Ok(MappedBuffer {
            id,
            data: vec![T::zeroed(); len],
        })
    }

    /// Map, fill from `values`, and seal in one step.
    pub fn buffer_from_slice<T: Pod>(&mut self, label: &str, values: &[T]) -> ContextResult<Buffer<T>> {
        let mut mapped = self.create_buffer(label, values.len())?;
        mapped.as_mut_slice().copy_from_slice(values);
        Ok(mapped.unmap())
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn set_ray_generation_program(&mut self, id: ProgramId) {
        self.installed.ray_generation = Some(id);
    }

    pub fn set_miss_program(&mut self, id: ProgramId) {
        self.installed.miss = Some(id);
    }

    pub fn set_exception_program(&mut self, id: ProgramId) {
        self.installed.exception = Some(id);
    }

    pub fn installed(&self) -> InstalledPrograms {
        self.installed
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::standard()
    }
}

/// A buffer while the host is still populating it.
#[derive(Debug)]
pub struct MappedBuffer<T: Pod> {
    id: BufferId,
    data: Vec<T>,
}

impl<T: Pod> MappedBuffer<T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Seal the buffer; no host writes are possible afterwards.
    pub fn unmap(self) -> Buffer<T> {
        Buffer {
            id: self.id,
            data: self.data.into(),
        }
    }
}

/// A sealed, read-only device buffer. Cloning shares the storage.
#[derive(Clone)]
pub struct Buffer<T> {
    id: BufferId,
    data: Arc<[T]>,
}

impl<T: Pod> Buffer<T> {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Raw bytes as the device would see them.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}
