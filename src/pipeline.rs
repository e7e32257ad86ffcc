//! Per-chunk unit of work: load from the source world, deep-copy, remap, store.

use crate::chunk::{ChunkCoord, ChunkData};
use crate::code_table::CodeRemapTable;
use crate::host::{ChunkStore, HostError};
use tracing::{trace, warn};

/// The fixed inputs of every chunk conversion in one run.
#[derive(Debug, Clone, Copy)]
pub struct ChunkJob<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub table: &'a CodeRemapTable,
    /// Extra attempts for chunk reads and writes failing with [`HostError::Io`].
    pub io_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// No chunk at this position; the edge of the world.
    Absent,
    Converted { cells_rewritten: usize },
}

impl ChunkOutcome {
    pub fn is_converted(self) -> bool {
        matches!(self, ChunkOutcome::Converted { .. })
    }
}

/// Converts one chunk and reports `coord` to `on_converted` once it has been written.
///
/// A chunk that cannot be loaded is [`ChunkOutcome::Absent`], not an error.
pub fn convert_chunk<S, F>(
    store: &mut S,
    job: &ChunkJob<'_>,
    coord: ChunkCoord,
    mut on_converted: F,
) -> Result<ChunkOutcome, HostError>
where
    S: ChunkStore + ?Sized,
    F: FnMut(ChunkCoord),
{
    if !retry_io(job.io_retries, || store.load_chunk(job.source, coord))? {
        return Ok(ChunkOutcome::Absent);
    }

    let mut chunk = match store.chunk(job.source, coord) {
        Some(chunk) => chunk.clone(),
        None => {
            return Err(HostError::Io {
                world: job.source.to_string(),
                coord,
                reason: "chunk reported loaded but is not resident".to_string(),
            })
        }
    };
    chunk.x = coord.x;
    chunk.z = coord.z;

    let cells_rewritten = job.table.remap_chunk(&mut chunk);

    store_chunk(store, job, coord, chunk)?;
    trace!("Converted chunk {} ({} cells remapped)", coord, cells_rewritten);
    on_converted(coord);

    Ok(ChunkOutcome::Converted { cells_rewritten })
}

fn retry_io<T>(
    retries: u32,
    mut op: impl FnMut() -> Result<T, HostError>,
) -> Result<T, HostError> {
    for attempt in 1..=retries {
        match op() {
            Err(err @ HostError::Io { .. }) => {
                warn!("Chunk read failed (attempt {}/{}): {}", attempt, retries + 1, err);
            }
            other => return other,
        }
    }
    op()
}

fn store_chunk<S: ChunkStore + ?Sized>(
    store: &mut S,
    job: &ChunkJob<'_>,
    coord: ChunkCoord,
    chunk: ChunkData,
) -> Result<(), HostError> {
    for attempt in 1..=job.io_retries {
        match store.set_chunk(job.target, coord, chunk.clone()) {
            Err(err @ HostError::Io { .. }) => {
                warn!(
                    "Chunk write failed (attempt {}/{}): {}",
                    attempt,
                    job.io_retries + 1,
                    err
                );
            }
            other => return other,
        }
    }
    store.set_chunk(job.target, coord, chunk)
}
