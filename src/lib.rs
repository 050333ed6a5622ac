//! Transition authorization for a gated, multi-stage delivery pipeline.
//!
//! Jobs move INTAKE → PLANNING → DESIGN → BUILD → TEST → SECURITY → RELEASE →
//! DONE, or drop to CANCELLED from any non-terminal stage. Each forward step
//! is gated by approvals whose required set depends on the job's
//! [`Strategy`] and [`RiskClassification`].
//!
//! - [`pipeline`] holds the pure core: [`StateGraph`], [`GatePolicy`] and
//!   [`TransitionEngine`].
//! - [`TransitionCommitter`] applies approved verdicts with a version-checked
//!   write.
//! - [`TransitionService`] composes both over a [`store`].

pub mod commit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod telemetry;

pub use commit::TransitionCommitter;
pub use config::{RetryConfig, StagegateConfig};
pub use error::{Result, StagegateError};
pub use pipeline::{
    ConditionalUpdate, GatePolicy, GateSet, GateStatus, GateType, Job, RiskClassification, State,
    StateChange, StateGraph, Strategy, TransitionEngine, TransitionVerdict,
};
pub use service::TransitionService;
pub use store::{FileStore, GateSource, JobSource, JobWriter, MemoryStore};
