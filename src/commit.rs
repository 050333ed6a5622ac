use tracing::{info, warn};

use crate::error::{Result, StagegateError};
use crate::pipeline::{ConditionalUpdate, Job, StateGraph, TransitionVerdict};
use crate::store::JobWriter;

/// Applies approved verdicts to stored jobs.
///
/// The only component that writes job state. The write is conditional on the
/// version the verdict was computed against, so of two commits made from the
/// same snapshot exactly one lands.
pub struct TransitionCommitter<'a, W> {
    writer: &'a W,
}

impl<'a, W: JobWriter> TransitionCommitter<'a, W> {
    pub fn new(writer: &'a W) -> Self {
        Self { writer }
    }

    /// Commit `verdict` against the snapshot it was computed from.
    pub async fn commit(&self, snapshot: &Job, verdict: &TransitionVerdict) -> Result<Job> {
        if !StateGraph::is_edge(snapshot.state, verdict.target) {
            return Err(StagegateError::NotReachable {
                from: snapshot.state,
                to: verdict.target,
                valid_targets: StateGraph::allowed_targets(snapshot.state).to_vec(),
            });
        }
        if !verdict.allowed {
            return Err(StagegateError::GateRequirementNotMet {
                from: snapshot.state,
                to: verdict.target,
                missing: verdict.missing_gates.clone(),
            });
        }

        let update = ConditionalUpdate {
            job_id: snapshot.id.clone(),
            expected_version: snapshot.version,
            new_state: verdict.target,
        };

        match self.writer.compare_and_swap(update).await {
            Ok(job) => {
                info!(
                    job_id = %job.id,
                    from = %snapshot.state,
                    to = %job.state,
                    version = job.version,
                    "transition committed"
                );
                Ok(job)
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(
                        job_id = %snapshot.id,
                        expected_version = snapshot.version,
                        "lost commit race"
                    );
                }
                Err(e)
            }
        }
    }
}
