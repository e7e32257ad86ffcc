//! Incremental world conversion.
//!
//! A conversion walks the source world's chunks with a resumable flood fill,
//! copies each chunk into a freshly created target world (optionally remapping
//! legacy block codes through a [`CodeRemapTable`]), and is driven a bounded
//! batch at a time by a [`ConversionScheduler`] from the host's tick loop.

pub mod chunk;
pub mod code_table;
pub mod codec;
pub mod config;
pub mod formats;
pub mod host;
pub mod memory;
pub mod pipeline;
pub mod process;
pub mod request;
pub mod scheduler;
pub mod traversal;

pub use chunk::{BlockCell, ChunkCoord, ChunkData};
pub use code_table::{CodeRemapTable, EditionTables};
pub use config::ConverterConfig;
pub use host::{ChunkStore, HostError, WorldHost};
pub use memory::MemoryHost;
pub use process::{ConversionProcess, ConversionSummary};
pub use request::{ConversionRequest, RequestError};
pub use scheduler::{ConversionScheduler, ProcessId, TickReport};
pub use traversal::{FloodFill, Progress};
