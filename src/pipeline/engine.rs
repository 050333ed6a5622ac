use serde::{Deserialize, Serialize};

use super::graph::StateGraph;
use super::policy::GatePolicy;
use super::state::{GateSet, RiskClassification, State, Strategy};
use crate::error::StagegateError;

/// The engine's decision for one candidate target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionVerdict {
    pub target: State,
    pub allowed: bool,
    pub required_gates: GateSet,
    /// `required_gates` minus the gates already at `PASS`.
    pub missing_gates: GateSet,
}

/// Decides which transitions are reachable and which are currently allowed.
///
/// Pure: every call is a function of its arguments only, so the engine can
/// be shared across any number of callers without synchronization.
pub struct TransitionEngine;

impl TransitionEngine {
    /// One verdict per outgoing edge of `current`, in graph order.
    pub fn valid_transitions(
        current: State,
        strategy: Strategy,
        risk: RiskClassification,
        passed: &GateSet,
    ) -> Vec<TransitionVerdict> {
        StateGraph::allowed_targets(current)
            .iter()
            .map(|&to| Self::verdict(current, to, strategy, risk, passed))
            .filter_map(Result::ok)
            .collect()
    }

    /// Verdict for a single target.
    ///
    /// A target that is not an outgoing edge of `current` is a malformed
    /// request and fails with `NotReachable`; a reachable target with unmet
    /// gates comes back as a verdict with `allowed == false`.
    pub fn evaluate(
        current: State,
        strategy: Strategy,
        risk: RiskClassification,
        passed: &GateSet,
        target: State,
    ) -> Result<TransitionVerdict, StagegateError> {
        Self::verdict(current, target, strategy, risk, passed)
    }

    /// Like [`evaluate`](Self::evaluate), but a blocked verdict becomes
    /// `GateRequirementNotMet` carrying the missing gates.
    pub fn authorize(
        current: State,
        strategy: Strategy,
        risk: RiskClassification,
        passed: &GateSet,
        target: State,
    ) -> Result<TransitionVerdict, StagegateError> {
        let verdict = Self::evaluate(current, strategy, risk, passed, target)?;
        if verdict.allowed {
            Ok(verdict)
        } else {
            Err(StagegateError::GateRequirementNotMet {
                from: current,
                to: target,
                missing: verdict.missing_gates,
            })
        }
    }

    fn verdict(
        from: State,
        to: State,
        strategy: Strategy,
        risk: RiskClassification,
        passed: &GateSet,
    ) -> Result<TransitionVerdict, StagegateError> {
        let required_gates = GatePolicy::required_gates(from, to, strategy, risk)?;
        let missing_gates: GateSet = required_gates.difference(passed).copied().collect();
        Ok(TransitionVerdict {
            target: to,
            allowed: missing_gates.is_empty(),
            required_gates,
            missing_gates,
        })
    }
}
