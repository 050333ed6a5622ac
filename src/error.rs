use thiserror::Error;

use crate::pipeline::{GateSet, State};

#[derive(Debug, Error)]
pub enum StagegateError {
    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Unknown gate type: {0}")]
    UnknownGateType(String),

    #[error("Unknown gate status: {0}")]
    UnknownGateStatus(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown risk classification: {0}")]
    UnknownRisk(String),

    #[error(
        "{to} is not reachable from {from} (valid targets: {})",
        join(valid_targets)
    )]
    NotReachable {
        from: State,
        to: State,
        valid_targets: Vec<State>,
    },

    #[error("{from} -> {to} is blocked, missing gates: {}", join(missing))]
    GateRequirementNotMet {
        from: State,
        to: State,
        missing: GateSet,
    },

    #[error("Job {job_id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        job_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl StagegateError {
    /// Only a lost compare-and-swap is worth retrying: re-read, re-evaluate,
    /// try again. Everything else is a caller bug or a business state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StagegateError::ConcurrentModification { .. })
    }
}

pub type Result<T, E = StagegateError> = std::result::Result<T, E>;

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}
