//! Capabilities the converter borrows from the hosting server.
//!
//! The converter never owns worlds. It asks the host to load, read and write
//! chunks, to create the target world, and to release memory between batches.

use crate::chunk::{ChunkCoord, ChunkData};
use crate::codec::CodecError;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("I/O failure in world \"{world}\" at chunk {coord}: {reason}")]
    Io {
        world: String,
        coord: ChunkCoord,
        reason: String,
    },
    #[error("World \"{0}\" is not loaded")]
    UnknownWorld(String),
    #[error("Could not create world \"{name}\": {reason}")]
    Create { name: String, reason: String },
    #[error("Chunk codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Metadata carried over from the source world to the target skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    pub name: String,
    pub format: String,
    pub seed: i64,
    pub generator: String,
}

/// Everything needed to create an empty target world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSpec {
    pub name: String,
    pub format: String,
    pub seed: i64,
    pub generator: String,
}

pub trait ChunkStore {
    /// Brings a chunk into memory. `Ok(false)` means the chunk does not exist.
    fn load_chunk(&mut self, world: &str, coord: ChunkCoord) -> Result<bool, HostError>;

    /// A chunk previously brought in with [`ChunkStore::load_chunk`].
    fn chunk(&self, world: &str, coord: ChunkCoord) -> Option<&ChunkData>;

    fn set_chunk(&mut self, world: &str, coord: ChunkCoord, chunk: ChunkData)
        -> Result<(), HostError>;
}

pub trait WorldHost: ChunkStore {
    fn is_world_loaded(&self, name: &str) -> bool;

    /// Attempts to load a world from storage. Returns `false` if it does not exist.
    fn load_world(&mut self, name: &str) -> bool;

    /// Whether a world with this name has already been generated on disk.
    fn world_exists(&self, name: &str) -> bool;

    fn world_info(&self, name: &str) -> Option<WorldInfo>;

    /// Whether a storage provider is registered under `format`.
    fn has_format(&self, format: &str) -> bool;

    /// Generates and registers an empty world.
    fn create_world(&mut self, spec: WorldSpec) -> Result<(), HostError>;

    fn loaded_worlds(&self) -> Vec<String>;

    /// Writes back and drops chunks nothing else holds on to.
    fn unload_unused_chunks(&mut self, world: &str);

    fn clear_cache(&mut self, world: &str);

    /// Process-wide memory reclamation.
    fn collect_garbage(&mut self);
}
