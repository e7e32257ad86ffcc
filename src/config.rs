use crate::chunk::ChunkCoord;
use crate::traversal::{BudgetPolicy, DEFAULT_DEPTH, DEFAULT_START};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid converter config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("batch_size must be at least 1")]
    BatchSize,
    #[error("initial_depth must be positive, got {0}")]
    Depth(i32),
}

/// Tuning for the converter. Every field has a default, so `{}` is a valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Chunk visits per process per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Failure budget the flood fill starts with.
    #[serde(default = "default_depth")]
    pub initial_depth: i32,
    /// Seed chunk of the flood fill.
    #[serde(default = "default_start")]
    pub start: ChunkCoord,
    #[serde(default)]
    pub budget_policy: BudgetPolicy,
    /// Extra attempts for a chunk read or write that fails with an I/O error.
    #[serde(default)]
    pub chunk_io_retries: u32,
}

fn default_batch_size() -> usize {
    200
}
fn default_depth() -> i32 {
    DEFAULT_DEPTH
}
fn default_start() -> ChunkCoord {
    DEFAULT_START
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            batch_size: default_batch_size(),
            initial_depth: default_depth(),
            start: default_start(),
            budget_policy: BudgetPolicy::default(),
            chunk_io_retries: 0,
        }
    }
}

impl ConverterConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ConverterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::BatchSize);
        }
        if self.initial_depth <= 0 {
            return Err(ConfigError::Depth(self.initial_depth));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ConverterConfig::from_json("{}").unwrap();
        assert_eq!(config, ConverterConfig::default());
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.initial_depth, 10);
        assert_eq!(config.start, ChunkCoord::new(1, 1));
    }

    #[test]
    fn test_partial_document() {
        let config = ConverterConfig::from_json(
            r#"{ "batch_size": 16, "budget_policy": "maximum", "start": { "x": -3, "z": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.budget_policy, BudgetPolicy::Maximum);
        assert_eq!(config.start, ChunkCoord::new(-3, 4));
        assert_eq!(config.chunk_io_retries, 0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ConverterConfig::from_json(r#"{ "batch_size": 0 }"#),
            Err(ConfigError::BatchSize)
        ));
        assert!(matches!(
            ConverterConfig::from_json(r#"{ "initial_depth": 0 }"#),
            Err(ConfigError::Depth(0))
        ));
        assert!(matches!(
            ConverterConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
