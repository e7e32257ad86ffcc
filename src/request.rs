use crate::chunk::ChunkCoord;
use crate::code_table::CodeRemapTable;
use crate::host::HostError;
use crate::process::{CompletionCallback, ConversionSummary, ProgressCallback};
use std::fmt;
use std::sync::Arc;

/// Reasons a conversion is refused before it starts.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("World \"{0}\" does not exist")]
    SourceMissing(String),
    #[error("Target world \"{0}\" is already generated")]
    TargetExists(String),
    #[error("No storage provider registered for format \"{0}\"")]
    UnknownFormat(String),
    #[error("Cannot convert from edition \"{from}\" to \"{to}\"; use \"BE JE\" or \"JE BE\"")]
    EditionPair { from: String, to: String },
    #[error("Host refused the request: {0}")]
    Host(#[from] HostError),
}

/// A request to copy `source` into a new world `target` stored as `format`.
pub struct ConversionRequest {
    pub source: String,
    pub target: String,
    pub format: String,
    pub code_table: Option<Arc<CodeRemapTable>>,
    pub(crate) on_chunk_converted: Option<ProgressCallback>,
    pub(crate) on_finished: Option<CompletionCallback>,
}

impl ConversionRequest {
    pub fn new(source: impl Into<String>, target: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            format: format.into(),
            code_table: None,
            on_chunk_converted: None,
            on_finished: None,
        }
    }

    pub fn with_code_table(mut self, table: Arc<CodeRemapTable>) -> Self {
        self.code_table = Some(table);
        self
    }

    pub fn on_chunk_converted(mut self, callback: impl FnMut(ChunkCoord) + 'static) -> Self {
        self.on_chunk_converted = Some(Box::new(callback));
        self
    }

    pub fn on_finished(mut self, callback: impl FnOnce(&ConversionSummary) + 'static) -> Self {
        self.on_finished = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("format", &self.format)
            .field("code_table_entries", &self.code_table.as_ref().map(|t| t.len()))
            .finish_non_exhaustive()
    }
}
