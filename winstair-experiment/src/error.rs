use std::path::PathBuf;
use winstair_core::{PartitionKey, StaircaseKey};

/// Fatal conditions of an experiment session. Participant timeouts and user
/// aborts are not errors and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("staircase {0} was never initialized")]
    InvalidKey(StaircaseKey),
    #[error("staircase {0} has no recorded trials")]
    EmptyHistory(StaircaseKey),
    #[error("stimulus pool {0} is exhausted")]
    PoolExhausted(PartitionKey),
    #[error("stimulus pool {partition} is malformed: {reason}")]
    MalformedPool {
        partition: PartitionKey,
        reason: String,
    },
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },
    #[error("failed to read {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("trial sink failed: {0}")]
    Sink(String),
}

impl ExperimentError {
    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
