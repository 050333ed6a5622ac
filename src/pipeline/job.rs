use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::StateGraph;
use super::state::{RiskClassification, State, Strategy};
use crate::error::StagegateError;

/// One committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: State,
    pub to: State,
    /// Job version produced by this change.
    pub version: u64,
    pub at: DateTime<Utc>,
}

/// A unit of work moving through the pipeline.
///
/// Stores own jobs; callers only ever see snapshots. `version` increases by
/// one on every committed transition and is what conditional writes check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub description: String,
    pub state: State,
    pub strategy: Strategy,
    pub risk: RiskClassification,
    pub version: u64,
    #[serde(default)]
    pub history: Vec<StateChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(description: String, strategy: Strategy, risk: RiskClassification) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            description,
            state: StateGraph::INITIAL,
            strategy,
            risk,
            version: 0,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `update` if the job is still at the expected version and the
    /// move is an edge of the graph.
    ///
    /// This is the compare-and-swap predicate every store funnels through.
    /// The version is checked first, so a stale caller sees a conflict.
    pub fn apply(&mut self, update: &ConditionalUpdate) -> Result<(), StagegateError> {
        if self.version != update.expected_version {
            return Err(StagegateError::ConcurrentModification {
                job_id: self.id.clone(),
                expected: update.expected_version,
                actual: self.version,
            });
        }
        if !StateGraph::is_edge(self.state, update.new_state) {
            return Err(StagegateError::NotReachable {
                from: self.state,
                to: update.new_state,
                valid_targets: StateGraph::allowed_targets(self.state).to_vec(),
            });
        }

        let now = Utc::now();
        self.version += 1;
        self.history.push(StateChange {
            from: self.state,
            to: update.new_state,
            version: self.version,
            at: now,
        });
        self.state = update.new_state;
        self.updated_at = now;
        Ok(())
    }
}

/// A write that only lands if the job is still at `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalUpdate {
    pub job_id: String,
    pub expected_version: u64,
    pub new_state: State,
}
