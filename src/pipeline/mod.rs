mod engine;
mod graph;
mod job;
mod policy;
mod state;

pub use engine::{TransitionEngine, TransitionVerdict};
pub use graph::StateGraph;
pub use job::{ConditionalUpdate, Job, StateChange};
pub use policy::GatePolicy;
pub use state::{GateSet, GateStatus, GateType, RiskClassification, State, Strategy};
