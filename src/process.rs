use crate::chunk::ChunkCoord;
use crate::code_table::CodeRemapTable;
use crate::config::ConverterConfig;
use crate::host::{HostError, WorldHost};
use crate::pipeline::{convert_chunk, ChunkJob, ChunkOutcome};
use crate::traversal::{FloodFill, Progress};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type ProgressCallback = Box<dyn FnMut(ChunkCoord)>;
pub type CompletionCallback = Box<dyn FnOnce(&ConversionSummary)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Finished,
}

/// Totals handed to the completion continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub source: String,
    pub target: String,
    pub chunks_converted: u64,
    /// Visits that found no chunk.
    pub chunks_probed: u64,
    pub cells_rewritten: u64,
}

/// One world conversion: a flood fill whose visits run the chunk pipeline.
pub struct ConversionProcess {
    source: String,
    target: String,
    table: Arc<CodeRemapTable>,
    io_retries: u32,
    traversal: FloodFill,
    on_chunk: Option<ProgressCallback>,
    on_finished: Option<CompletionCallback>,
    state: ProcessState,
    cancel_requested: bool,
    chunks_converted: u64,
    cells_rewritten: u64,
}

impl ConversionProcess {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        table: Arc<CodeRemapTable>,
        config: &ConverterConfig,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            table,
            io_retries: config.chunk_io_retries,
            traversal: FloodFill::with_start(
                config.start,
                config.initial_depth,
                config.budget_policy,
            ),
            on_chunk: None,
            on_finished: None,
            state: ProcessState::Running,
            cancel_requested: false,
            chunks_converted: 0,
            cells_rewritten: 0,
        }
    }

    /// Called with each chunk position right after it has been written.
    pub fn on_chunk_converted(mut self, callback: impl FnMut(ChunkCoord) + 'static) -> Self {
        self.on_chunk = Some(Box::new(callback));
        self
    }

    /// Called once, when the traversal runs out of chunks. Under a
    /// [`ConversionScheduler`](crate::scheduler::ConversionScheduler) it runs after
    /// the reclamation sweep of the final batch, so every written chunk is flushed.
    pub fn on_finished(mut self, callback: impl FnOnce(&ConversionSummary) + 'static) -> Self {
        self.on_finished = Some(Box::new(callback));
        self
    }

    pub(crate) fn set_callbacks(
        &mut self,
        on_chunk: Option<ProgressCallback>,
        on_finished: Option<CompletionCallback>,
    ) {
        self.on_chunk = on_chunk;
        self.on_finished = on_finished;
    }

    /// Runs one batch of at most `batch_size` chunk visits.
    ///
    /// The first time the traversal reports [`Progress::Exhausted`] the process
    /// becomes [`ProcessState::Finished`] and the completion continuation runs.
    pub fn advance<H>(&mut self, host: &mut H, batch_size: usize) -> Result<Progress, HostError>
    where
        H: WorldHost + ?Sized,
    {
        let progress = self.run_batch(host, batch_size)?;
        if progress == Progress::Exhausted {
            self.complete();
        }
        Ok(progress)
    }

    /// [`advance`](Self::advance) without the completion continuation.
    pub(crate) fn run_batch<H>(&mut self, host: &mut H, batch_size: usize) -> Result<Progress, HostError>
    where
        H: WorldHost + ?Sized,
    {
        if self.state == ProcessState::Finished {
            return Ok(Progress::Exhausted);
        }

        let job = ChunkJob {
            source: &self.source,
            target: &self.target,
            table: &self.table,
            io_retries: self.io_retries,
        };
        let on_chunk = &mut self.on_chunk;
        let chunks_converted = &mut self.chunks_converted;
        let cells_rewritten = &mut self.cells_rewritten;
        let visits_before = self.traversal.visits();

        let progress = self.traversal.advance(batch_size, |coord| -> Result<bool, HostError> {
            let outcome = convert_chunk(host, &job, coord, |c| {
                if let Some(callback) = on_chunk.as_mut() {
                    callback(c);
                }
            })?;
            match outcome {
                ChunkOutcome::Converted { cells_rewritten: n } => {
                    *chunks_converted += 1;
                    *cells_rewritten += n as u64;
                    Ok(true)
                }
                ChunkOutcome::Absent => Ok(false),
            }
        })?;

        debug!(
            "{} -> {}: {} visits this batch, {} chunks converted so far",
            self.source,
            self.target,
            self.traversal.visits() - visits_before,
            self.chunks_converted
        );

        if progress == Progress::Exhausted {
            self.state = ProcessState::Finished;
        }
        Ok(progress)
    }

    /// Runs the completion continuation of a finished process. Later calls do nothing.
    pub(crate) fn complete(&mut self) {
        if self.state != ProcessState::Finished {
            return;
        }
        if let Some(callback) = self.on_finished.take() {
            let summary = self.summary();
            callback(&summary);
        }
    }

    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary {
            source: self.source.clone(),
            target: self.target.clone(),
            chunks_converted: self.chunks_converted,
            chunks_probed: self.traversal.failures(),
            cells_rewritten: self.cells_rewritten,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Asks the scheduler to drop this process at its next batch boundary.
    pub fn cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested
    }
}

impl fmt::Debug for ConversionProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionProcess")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("state", &self.state)
            .field("visits", &self.traversal.visits())
            .field("chunks_converted", &self.chunks_converted)
            .finish_non_exhaustive()
    }
}
