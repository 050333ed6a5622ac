//! Boundary operations: read a job, evaluate, commit.
//!
//! [`TransitionService`] is what an outer layer (CLI, HTTP handler) calls.
//! `request_transition` never retries; a `ConcurrentModification` goes
//! straight back to the caller, who decides whether to re-read and try again.
//! Callers that want a backoff loop opt in via `request_transition_retrying`.

use std::time::Duration;

use tracing::{Instrument, debug, info_span, warn};

use crate::commit::TransitionCommitter;
use crate::config::RetryConfig;
use crate::error::{Result, StagegateError};
use crate::pipeline::{Job, State, TransitionEngine, TransitionVerdict};
use crate::store::{GateSource, JobSource, JobWriter};

pub struct TransitionService<S> {
    store: S,
}

impl<S> TransitionService<S>
where
    S: JobSource + GateSource + JobWriter,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// What can happen next for `job_id`, one verdict per outgoing edge.
    pub async fn list_valid_transitions(&self, job_id: &str) -> Result<Vec<TransitionVerdict>> {
        let job = self.store.load_job(job_id).await?;
        let passed = self.store.passed_gates(job_id).await?;
        debug!(job_id, state = %job.state, passed = passed.len(), "listing transitions");
        Ok(TransitionEngine::valid_transitions(
            job.state,
            job.strategy,
            job.risk,
            &passed,
        ))
    }

    /// Move `job_id` to `target` if the graph and its gates allow it.
    pub async fn request_transition(&self, job_id: &str, target: State) -> Result<Job> {
        let span = info_span!("request_transition", job_id, %target);
        async {
            let job = self.store.load_job(job_id).await?;
            let passed = self.store.passed_gates(job_id).await?;

            let verdict = TransitionEngine::authorize(
                job.state,
                job.strategy,
                job.risk,
                &passed,
                target,
            )
            .inspect_err(|e| log_rejection(&job, e))?;

            TransitionCommitter::new(&self.store)
                .commit(&job, &verdict)
                .await
        }
        .instrument(span)
        .await
    }

    /// [`request_transition`](Self::request_transition) with a caller-chosen
    /// retry policy: a lost commit race is re-read and re-evaluated up to
    /// `retry.max_retries` times with exponential backoff. Any other error
    /// returns immediately.
    pub async fn request_transition_retrying(
        &self,
        job_id: &str,
        target: State,
        retry: &RetryConfig,
    ) -> Result<Job> {
        let mut attempt = 0;
        loop {
            match self.request_transition(job_id, target).await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay_ms = retry.delay_for_attempt(attempt);
                    warn!(
                        job_id,
                        attempt,
                        max = retry.max_retries,
                        delay_ms,
                        "retrying after conflict"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                result => return result,
            }
        }
    }
}

fn log_rejection(job: &Job, err: &StagegateError) {
    match err {
        StagegateError::GateRequirementNotMet { missing, .. } => {
            warn!(state = %job.state, missing = missing.len(), "transition blocked by gates");
        }
        StagegateError::NotReachable { .. } => {
            warn!(state = %job.state, "transition target not reachable");
        }
        _ => {}
    }
}
