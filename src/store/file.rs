use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tracing::debug;

use super::{GateRecords, GateSource, JobSource, JobWriter, StoreSnapshot, passed};
use crate::error::{Result, StagegateError};
use crate::pipeline::{
    ConditionalUpdate, GateSet, GateStatus, GateType, Job, RiskClassification, Strategy,
};

/// Store backed by a single JSON document.
///
/// Every operation runs under an OS lock on a sibling `.lock` file: shared for
/// reads, exclusive for read-modify-write. Separate handles, in this process
/// or another, serialize on that lock, so a conditional write never lands on
/// top of a stale read. Writes go to a sibling temp file, renamed over the
/// original while the exclusive lock is still held.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, ".lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn create_job(
        &self,
        description: impl Into<String>,
        strategy: Strategy,
        risk: RiskClassification,
    ) -> Result<Job> {
        let description = description.into();
        let job = self
            .update(move |snapshot| {
                let job = Job::new(description, strategy, risk);
                snapshot.gates.entry(job.id.clone()).or_default();
                snapshot.jobs.insert(job.id.clone(), job.clone());
                Ok(job)
            })
            .await?;
        debug!(job_id = %job.id, path = %self.path.display(), "created job");
        Ok(job)
    }

    pub async fn record_gate(
        &self,
        job_id: &str,
        gate: GateType,
        status: GateStatus,
    ) -> Result<()> {
        let id = job_id.to_string();
        self.update(move |snapshot| {
            if !snapshot.jobs.contains_key(&id) {
                return Err(StagegateError::NotFound(id));
            }
            snapshot.gates.entry(id).or_default().insert(gate, status);
            Ok(())
        })
        .await?;
        debug!(job_id, gate = %gate, status = %status, "recorded gate");
        Ok(())
    }

    pub async fn gate_records(&self, job_id: &str) -> Result<GateRecords> {
        let id = job_id.to_string();
        self.view(move |mut snapshot| {
            if !snapshot.jobs.contains_key(&id) {
                return Err(StagegateError::NotFound(id));
            }
            Ok(snapshot.gates.remove(&id).unwrap_or_default())
        })
        .await
    }

    pub async fn jobs(&self) -> Result<Vec<Job>> {
        self.view(|snapshot| Ok(snapshot.jobs.into_values().collect()))
            .await
    }

    /// Run `op` on the stored document under a shared lock.
    async fn view<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(StoreSnapshot) -> Result<T> + Send + 'static,
    {
        let (path, lock_path) = (self.path.clone(), self.lock_path.clone());
        blocking(move || {
            let lock = RwLock::new(open_lock(&lock_path)?);
            let _guard = lock.read()?;
            let snapshot = read_snapshot(&path)?;
            op(snapshot)
        })
        .await
    }

    /// Run `op` on the stored document under an exclusive lock and persist
    /// the result. Nothing is written when `op` fails.
    async fn update<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreSnapshot) -> Result<T> + Send + 'static,
    {
        let (path, lock_path) = (self.path.clone(), self.lock_path.clone());
        blocking(move || {
            let mut lock = RwLock::new(open_lock(&lock_path)?);
            let _guard = lock.write()?;
            let mut snapshot = read_snapshot(&path)?;
            let out = op(&mut snapshot)?;
            write_snapshot(&path, &snapshot)?;
            Ok(out)
        })
        .await
    }
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StagegateError::Io(std::io::Error::other(e)))?
}

fn open_lock(lock_path: &Path) -> Result<File> {
    if let Some(parent) = lock_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;
    Ok(file)
}

fn read_snapshot(path: &Path) -> Result<StoreSnapshot> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(StoreSnapshot::default()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreSnapshot::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let tmp = sibling(path, ".tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl JobSource for FileStore {
    async fn load_job(&self, job_id: &str) -> Result<Job> {
        let id = job_id.to_string();
        self.view(move |mut snapshot| {
            snapshot
                .jobs
                .remove(&id)
                .ok_or(StagegateError::NotFound(id))
        })
        .await
    }
}

impl GateSource for FileStore {
    async fn passed_gates(&self, job_id: &str) -> Result<GateSet> {
        Ok(passed(&self.gate_records(job_id).await?))
    }
}

impl JobWriter for FileStore {
    async fn compare_and_swap(&self, update: ConditionalUpdate) -> Result<Job> {
        self.update(move |snapshot| {
            let job = snapshot
                .jobs
                .get_mut(&update.job_id)
                .ok_or_else(|| StagegateError::NotFound(update.job_id.clone()))?;
            job.apply(&update)?;
            Ok(job.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::State;

    fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("state").join("jobs.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.jobs().await.unwrap().is_empty());
        assert!(matches!(
            store.load_job("absent").await,
            Err(StagegateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn jobs_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let job = {
            let store = store_in(&dir);
            let job = store
                .create_job(
                    "Migrate billing",
                    Strategy::Standard,
                    RiskClassification::High,
                )
                .await
                .unwrap();
            store
                .record_gate(&job.id, GateType::IntakeBriefApproved, GateStatus::Pass)
                .await
                .unwrap();
            job
        };

        let reopened = store_in(&dir);
        assert_eq!(reopened.load_job(&job.id).await.unwrap(), job);
        assert_eq!(
            reopened.passed_gates(&job.id).await.unwrap(),
            [GateType::IntakeBriefApproved].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn compare_and_swap_persists_and_rejects_stale_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let job = store
            .create_job("Add SSO", Strategy::FastTrack, RiskClassification::Low)
            .await
            .unwrap();

        let update = ConditionalUpdate {
            job_id: job.id.clone(),
            expected_version: 0,
            new_state: State::Cancelled,
        };
        store.compare_and_swap(update.clone()).await.unwrap();

        let reloaded = store_in(&dir).load_job(&job.id).await.unwrap();
        assert_eq!(reloaded.state, State::Cancelled);
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.history.len(), 1);

        let err = store.compare_and_swap(update).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(path);
        assert!(matches!(store.jobs().await, Err(StagegateError::Json(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_handles_race_to_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..40 {
            let job = store_in(&dir)
                .create_job("Rotate keys", Strategy::Standard, RiskClassification::Low)
                .await
                .unwrap();

            let racers: Vec<_> = (0..2)
                .map(|_| {
                    let store = store_in(&dir);
                    let update = ConditionalUpdate {
                        job_id: job.id.clone(),
                        expected_version: 0,
                        new_state: State::Cancelled,
                    };
                    tokio::spawn(async move { store.compare_and_swap(update).await })
                })
                .collect();

            let mut wins = 0;
            for racer in racers {
                match racer.await.unwrap() {
                    Ok(_) => wins += 1,
                    Err(e) => assert!(matches!(
                        e,
                        StagegateError::ConcurrentModification {
                            expected: 0,
                            actual: 1,
                            ..
                        }
                    )),
                }
            }
            assert_eq!(wins, 1);

            let stored = store_in(&dir).load_job(&job.id).await.unwrap();
            assert_eq!(stored.version, 1);
            assert_eq!(stored.history.len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gate_recorded_during_commit_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..40 {
            let job = store_in(&dir)
                .create_job(
                    "Ship audit log",
                    Strategy::Standard,
                    RiskClassification::Low,
                )
                .await
                .unwrap();

            let gates = store_in(&dir);
            let writer = store_in(&dir);
            let id = job.id.clone();
            let record = tokio::spawn(async move {
                gates
                    .record_gate(&id, GateType::IntakeBriefApproved, GateStatus::Pass)
                    .await
            });
            let update = ConditionalUpdate {
                job_id: job.id.clone(),
                expected_version: 0,
                new_state: State::Cancelled,
            };
            let commit = tokio::spawn(async move { writer.compare_and_swap(update).await });

            record.await.unwrap().unwrap();
            commit.await.unwrap().unwrap();

            let store = store_in(&dir);
            assert_eq!(
                store.load_job(&job.id).await.unwrap().state,
                State::Cancelled
            );
            assert_eq!(
                store.passed_gates(&job.id).await.unwrap(),
                [GateType::IntakeBriefApproved].into_iter().collect()
            );
        }
    }

    #[tokio::test]
    async fn lock_and_temp_files_sit_beside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .create_job("Index docs", Strategy::Standard, RiskClassification::Low)
            .await
            .unwrap();

        let state_dir = dir.path().join("state");
        assert!(state_dir.join("jobs.json").exists());
        assert!(state_dir.join("jobs.json.lock").exists());
        assert!(!state_dir.join("jobs.json.tmp").exists());
    }
}
