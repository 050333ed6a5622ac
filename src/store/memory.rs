use tokio::sync::RwLock;
use tracing::debug;

use super::{GateRecords, GateSource, JobSource, JobWriter, StoreSnapshot, passed};
use crate::error::{Result, StagegateError};
use crate::pipeline::{
    ConditionalUpdate, GateSet, GateStatus, GateType, Job, RiskClassification, Strategy,
};

/// In-process store. The write lock makes each compare-and-swap atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job in `INTAKE` and return it.
    pub async fn create_job(
        &self,
        description: impl Into<String>,
        strategy: Strategy,
        risk: RiskClassification,
    ) -> Job {
        let job = Job::new(description.into(), strategy, risk);
        self.insert_job(job.clone()).await;
        job
    }

    pub async fn insert_job(&self, job: Job) {
        let mut inner = self.inner.write().await;
        debug!(job_id = %job.id, state = %job.state, "storing job");
        inner.gates.entry(job.id.clone()).or_default();
        inner.jobs.insert(job.id.clone(), job);
    }

    /// Record the outcome of a gate. Stands in for the subsystem that
    /// produces gate evidence.
    pub async fn record_gate(
        &self,
        job_id: &str,
        gate: GateType,
        status: GateStatus,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.jobs.contains_key(job_id) {
            return Err(StagegateError::NotFound(job_id.to_string()));
        }
        debug!(job_id, gate = %gate, status = %status, "recording gate");
        inner.gates.entry(job_id.to_string()).or_default().insert(gate, status);
        Ok(())
    }

    pub async fn gate_records(&self, job_id: &str) -> Result<GateRecords> {
        let inner = self.inner.read().await;
        if !inner.jobs.contains_key(job_id) {
            return Err(StagegateError::NotFound(job_id.to_string()));
        }
        Ok(inner.gates.get(job_id).cloned().unwrap_or_default())
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.inner.read().await.jobs.values().cloned().collect()
    }
}

impl JobSource for MemoryStore {
    async fn load_job(&self, job_id: &str) -> Result<Job> {
        self.inner
            .read()
            .await
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| StagegateError::NotFound(job_id.to_string()))
    }
}

impl GateSource for MemoryStore {
    async fn passed_gates(&self, job_id: &str) -> Result<GateSet> {
        Ok(passed(&self.gate_records(job_id).await?))
    }
}

impl JobWriter for MemoryStore {
    async fn compare_and_swap(&self, update: ConditionalUpdate) -> Result<Job> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&update.job_id)
            .ok_or_else(|| StagegateError::NotFound(update.job_id.clone()))?;
        job.apply(&update)?;
        Ok(job.clone())
    }
}
