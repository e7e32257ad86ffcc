//! Tick-driven driver for every active conversion.
//!
//! The host calls [`ConversionScheduler::tick`] once per scheduling interval.
//! Each tick advances every active process by one batch and sweeps memory after
//! each batch, so no tick does more than `batch_size` chunk visits per process.

use crate::code_table::CodeRemapTable;
use crate::config::{ConfigError, ConverterConfig};
use crate::host::{WorldHost, WorldSpec};
use crate::process::{ConversionProcess, ProcessState};
use crate::request::{ConversionRequest, RequestError};
use crate::traversal::Progress;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened during one [`ConversionScheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: usize,
    pub finished: Vec<ProcessId>,
    /// Processes whose batch was aborted by a host fault. They stay active.
    pub faulted: Vec<ProcessId>,
    pub cancelled: Vec<ProcessId>,
}

#[derive(Debug, Default)]
pub struct ConversionScheduler {
    config: ConverterConfig,
    processes: BTreeMap<ProcessId, ConversionProcess>,
    next_id: u64,
}

impl ConversionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConverterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Adds a process to the active set. Nothing runs until the next tick.
    pub fn submit(&mut self, process: ConversionProcess) -> ProcessId {
        let id = ProcessId(self.next_id);
        self.next_id += 1;
        self.processes.insert(id, process);
        id
    }

    /// Validates a request, creates the target world and submits its conversion.
    ///
    /// Nothing is created when the request is rejected.
    pub fn request_conversion<H>(
        &mut self,
        host: &mut H,
        request: ConversionRequest,
    ) -> Result<ProcessId, RequestError>
    where
        H: WorldHost + ?Sized,
    {
        let ConversionRequest {
            source,
            target,
            format,
            code_table,
            on_chunk_converted,
            on_finished,
        } = request;

        if !host.is_world_loaded(&source) {
            info!("World \"{}\" seems not loaded, trying to load it", source);
            if !host.load_world(&source) {
                return Err(RequestError::SourceMissing(source));
            }
        }
        if host.world_exists(&target) {
            return Err(RequestError::TargetExists(target));
        }
        if !host.has_format(&format) {
            return Err(RequestError::UnknownFormat(format));
        }
        let info = host
            .world_info(&source)
            .ok_or_else(|| RequestError::SourceMissing(source.clone()))?;

        host.create_world(WorldSpec {
            name: target.clone(),
            format: format.clone(),
            seed: info.seed,
            generator: info.generator,
        })?;

        let table = code_table.unwrap_or_else(|| Arc::new(CodeRemapTable::new()));
        let mut process = ConversionProcess::new(source, target, table.clone(), &self.config);
        process.set_callbacks(on_chunk_converted, on_finished);

        let id = self.submit(process);
        info!(
            "Conversion {} accepted: \"{}\" -> \"{}\" as {} ({} remap entries)",
            id,
            self.processes[&id].source(),
            self.processes[&id].target(),
            format,
            table.len()
        );
        Ok(id)
    }

    /// Advances every active process by one batch.
    pub fn tick<H>(&mut self, host: &mut H) -> TickReport
    where
        H: WorldHost + ?Sized,
    {
        let mut report = TickReport::default();
        let batch_size = self.config.batch_size.max(1);

        for (&id, process) in self.processes.iter_mut() {
            if process.is_cancel_requested() {
                report.cancelled.push(id);
                continue;
            }

            let result = process.run_batch(host, batch_size);
            report.advanced += 1;
            reclaim(host);

            match result {
                Ok(Progress::Continuing) => {}
                Ok(Progress::Exhausted) => {
                    process.complete();
                    let summary = process.summary();
                    info!(
                        "Conversion {} finished: {} chunks converted into \"{}\"",
                        id, summary.chunks_converted, summary.target
                    );
                    report.finished.push(id);
                }
                Err(e) => {
                    warn!("Conversion {} aborted this batch: {}", id, e);
                    report.faulted.push(id);
                }
            }
        }

        for id in report.finished.iter().chain(&report.cancelled) {
            self.processes.remove(id);
        }
        report
    }

    /// Requests cancellation; the process is dropped at its next batch boundary
    /// without running its completion continuation.
    pub fn cancel(&mut self, id: ProcessId) -> bool {
        match self.processes.get_mut(&id) {
            Some(process) => {
                process.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: ProcessId) -> bool {
        self.processes
            .get(&id)
            .is_some_and(|p| p.state() == ProcessState::Running)
    }

    pub fn process(&self, id: ProcessId) -> Option<&ConversionProcess> {
        self.processes.get(&id)
    }

    pub fn active_count(&self) -> usize {
        self.processes.len()
    }

    pub fn is_idle(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Releases chunks and caches in every loaded world, then asks the host to reclaim memory.
pub fn reclaim<H: WorldHost + ?Sized>(host: &mut H) {
    for world in host.loaded_worlds() {
        host.unload_unused_chunks(&world);
        host.clear_cache(&world);
    }
    host.collect_garbage();
    trace!("Reclamation sweep done");
}
