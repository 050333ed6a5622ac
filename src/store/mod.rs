//! Storage seams consumed by the transition service.
//!
//! The engine itself never touches storage. These traits describe the three
//! collaborators it needs at the boundary: a job snapshot reader, a gate
//! snapshot reader and a version-checked job writer. [`MemoryStore`] and
//! [`FileStore`] implement all three.

mod file;
mod memory;

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::{ConditionalUpdate, GateSet, GateStatus, GateType, Job};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Reads job snapshots.
pub trait JobSource {
    /// Fails with `NotFound` when no job has this id.
    fn load_job(&self, job_id: &str) -> impl Future<Output = Result<Job>> + Send;
}

/// Reads the set of gates currently at `PASS` for a job.
pub trait GateSource {
    fn passed_gates(&self, job_id: &str) -> impl Future<Output = Result<GateSet>> + Send;
}

/// Applies version-checked writes.
pub trait JobWriter {
    /// Apply `update` only if the stored version equals
    /// `update.expected_version`; otherwise fail with
    /// `ConcurrentModification`. Returns the job as written.
    fn compare_and_swap(
        &self,
        update: ConditionalUpdate,
    ) -> impl Future<Output = Result<Job>> + Send;
}

/// Gate records of one job, keyed by gate type.
pub type GateRecords = BTreeMap<GateType, GateStatus>;

/// Gates of `records` currently at `PASS`.
pub fn passed(records: &GateRecords) -> GateSet {
    records
        .iter()
        .filter(|(_, status)| **status == GateStatus::Pass)
        .map(|(gate, _)| *gate)
        .collect()
}

/// Everything a store keeps: jobs and their gate records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub jobs: BTreeMap<String, Job>,
    #[serde(default)]
    pub gates: BTreeMap<String, GateRecords>,
}
