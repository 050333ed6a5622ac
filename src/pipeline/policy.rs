use super::graph::StateGraph;
use super::state::{GateSet, GateType, RiskClassification, State, Strategy};
use crate::error::StagegateError;

const NO_GATES: &[GateType] = &[];
const INTAKE_TO_PLANNING: &[GateType] = &[GateType::IntakeBriefApproved];
const PLANNING_TO_DESIGN: &[GateType] = &[GateType::PlanApproved];
const DESIGN_TO_BUILD: &[GateType] = &[GateType::ArchitectureReview];
const BUILD_TO_TEST: &[GateType] = &[GateType::CodeReview];
const TEST_TO_SECURITY: &[GateType] = &[GateType::QaSignoff];
const SECURITY_TO_RELEASE: &[GateType] = &[GateType::SecurityAudit];
const RELEASE_TO_DONE: &[GateType] = &[GateType::ReleaseSignoff];

/// Gates `FAST_TRACK` may drop below `HIGH` risk.
const FAST_TRACK_WAIVERS: &[GateType] = &[GateType::PlanApproved, GateType::ArchitectureReview];

/// Derives the gates a transition requires.
///
/// The result is built in three layers:
///
/// 1. the baseline template for the edge (`STANDARD` strategy, `LOW` risk),
/// 2. strategy waivers, which never touch strategy-invariant gates,
/// 3. risk escalation, which only ever adds gates.
///
/// Cancellation edges require nothing.
pub struct GatePolicy;

impl GatePolicy {
    /// Gates required to move from `from` to `to`.
    ///
    /// Fails with `NotReachable` when `(from, to)` is not an edge of the
    /// [`StateGraph`].
    pub fn required_gates(
        from: State,
        to: State,
        strategy: Strategy,
        risk: RiskClassification,
    ) -> Result<GateSet, StagegateError> {
        if !StateGraph::is_edge(from, to) {
            return Err(StagegateError::NotReachable {
                from,
                to,
                valid_targets: StateGraph::allowed_targets(from).to_vec(),
            });
        }
        if to == State::Cancelled {
            return Ok(GateSet::new());
        }

        let mut gates: GateSet = baseline(from, to).iter().copied().collect();

        if strategy == Strategy::FastTrack && risk < RiskClassification::High {
            let invariant = strategy_invariant(from, to);
            gates.retain(|gate| invariant.contains(gate) || !FAST_TRACK_WAIVERS.contains(gate));
        }

        if risk == RiskClassification::High {
            if touches_security_or_release(from, to) {
                gates.insert(GateType::ComplianceReview);
            }
            if from == State::Security {
                gates.insert(GateType::SecurityAudit);
            }
        }

        Ok(gates)
    }

    /// Required gates for every forward edge, in pipeline order.
    pub fn matrix(strategy: Strategy, risk: RiskClassification) -> Vec<(State, State, GateSet)> {
        StateGraph::forward_path()
            .windows(2)
            .filter_map(|edge| {
                let (from, to) = (edge[0], edge[1]);
                Self::required_gates(from, to, strategy, risk)
                    .ok()
                    .map(|gates| (from, to, gates))
            })
            .collect()
    }
}

fn baseline(from: State, to: State) -> &'static [GateType] {
    match (from, to) {
        (State::Intake, State::Planning) => INTAKE_TO_PLANNING,
        (State::Planning, State::Design) => PLANNING_TO_DESIGN,
        (State::Design, State::Build) => DESIGN_TO_BUILD,
        (State::Build, State::Test) => BUILD_TO_TEST,
        (State::Test, State::Security) => TEST_TO_SECURITY,
        (State::Security, State::Release) => SECURITY_TO_RELEASE,
        (State::Release, State::Done) => RELEASE_TO_DONE,
        _ => NO_GATES,
    }
}

// Gates no strategy may waive on this edge.
fn strategy_invariant(from: State, to: State) -> &'static [GateType] {
    match (from, to) {
        (State::Build, State::Test) => BUILD_TO_TEST,
        (State::Security, State::Release) => SECURITY_TO_RELEASE,
        _ => NO_GATES,
    }
}

fn touches_security_or_release(from: State, to: State) -> bool {
    [from, to]
        .iter()
        .any(|s| matches!(s, State::Security | State::Release))
}

#[cfg(test)]
mod tests {
    use super::*;
    use GateType::*;
    use RiskClassification as Risk;

    fn set(gates: &[GateType]) -> GateSet {
        gates.iter().copied().collect()
    }

    fn gates(edge: (State, State), strategy: Strategy, risk: Risk) -> GateSet {
        let (from, to) = edge;
        GatePolicy::required_gates(from, to, strategy, risk)
            .unwrap_or_else(|e| panic!("{from} -> {to}: {e}"))
    }

    const FORWARD_EDGES: [(State, State); 7] = [
        (State::Intake, State::Planning),
        (State::Planning, State::Design),
        (State::Design, State::Build),
        (State::Build, State::Test),
        (State::Test, State::Security),
        (State::Security, State::Release),
        (State::Release, State::Done),
    ];

    /// Expected gate sets for the whole strategy × risk × edge matrix.
    fn expected(strategy: Strategy, risk: Risk, edge: (State, State)) -> GateSet {
        use State::*;
        let waived = strategy == Strategy::FastTrack && risk != Risk::High;
        let high = risk == Risk::High;
        match edge {
            (Intake, Planning) => set(&[IntakeBriefApproved]),
            (Planning, Design) if waived => set(&[]),
            (Planning, Design) => set(&[PlanApproved]),
            (Design, Build) if waived => set(&[]),
            (Design, Build) => set(&[ArchitectureReview]),
            (Build, Test) => set(&[CodeReview]),
            (Test, Security) if high => set(&[QaSignoff, ComplianceReview]),
            (Test, Security) => set(&[QaSignoff]),
            (Security, Release) if high => set(&[SecurityAudit, ComplianceReview]),
            (Security, Release) => set(&[SecurityAudit]),
            (Release, Done) if high => set(&[ReleaseSignoff, ComplianceReview]),
            (Release, Done) => set(&[ReleaseSignoff]),
            other => panic!("not a forward edge: {other:?}"),
        }
    }

    #[test]
    fn full_matrix_matches_template() {
        let mut checked = 0;
        for strategy in Strategy::ALL {
            for risk in Risk::ALL {
                for edge in FORWARD_EDGES {
                    assert_eq!(
                        gates(edge, strategy, risk),
                        expected(strategy, risk, edge),
                        "{strategy}/{risk} {} -> {}",
                        edge.0,
                        edge.1
                    );
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 2 * 3 * 7);
    }

    #[test]
    fn cancellation_never_requires_gates() {
        for strategy in Strategy::ALL {
            for risk in Risk::ALL {
                for from in State::ALL.into_iter().filter(|s| !s.is_terminal()) {
                    let required = gates((from, State::Cancelled), strategy, risk);
                    assert!(
                        required.is_empty(),
                        "{from} -> CANCELLED under {strategy}/{risk}"
                    );
                }
            }
        }
    }

    #[test]
    fn gates_are_monotone_in_risk() {
        for strategy in Strategy::ALL {
            for edge in FORWARD_EDGES {
                let low = gates(edge, strategy, Risk::Low);
                let standard = gates(edge, strategy, Risk::Standard);
                let high = gates(edge, strategy, Risk::High);
                assert!(
                    low.is_subset(&standard),
                    "{strategy} {edge:?}: LOW ⊄ STANDARD"
                );
                assert!(
                    standard.is_subset(&high),
                    "{strategy} {edge:?}: STANDARD ⊄ HIGH"
                );
            }
        }
    }

    #[test]
    fn fast_track_only_removes_gates() {
        for risk in Risk::ALL {
            for edge in FORWARD_EDGES {
                let standard = gates(edge, Strategy::Standard, risk);
                let fast = gates(edge, Strategy::FastTrack, risk);
                assert!(fast.is_subset(&standard), "{risk} {edge:?}");
            }
        }
    }

    #[test]
    fn strategy_invariant_gates_survive_fast_track() {
        for risk in Risk::ALL {
            let build_test = gates((State::Build, State::Test), Strategy::FastTrack, risk);
            assert!(build_test.contains(&CodeReview));

            let security_release =
                gates((State::Security, State::Release), Strategy::FastTrack, risk);
            assert!(security_release.contains(&SecurityAudit));
        }
    }

    #[test]
    fn high_risk_forces_security_audit_and_compliance() {
        let required = gates(
            (State::Security, State::Release),
            Strategy::FastTrack,
            Risk::High,
        );
        assert_eq!(required, set(&[SecurityAudit, ComplianceReview]));
    }

    #[test]
    fn non_edges_are_not_reachable() {
        let err = GatePolicy::required_gates(
            State::Build,
            State::Done,
            Strategy::Standard,
            Risk::Low,
        )
        .unwrap_err();
        match err {
            StagegateError::NotReachable {
                from,
                to,
                valid_targets,
            } => {
                assert_eq!(from, State::Build);
                assert_eq!(to, State::Done);
                assert_eq!(valid_targets, vec![State::Test, State::Cancelled]);
            }
            other => panic!("expected NotReachable, got {other:?}"),
        }

        let from_done = GatePolicy::required_gates(
            State::Done,
            State::Cancelled,
            Strategy::Standard,
            Risk::Low,
        );
        assert!(from_done.is_err());
    }

    #[test]
    fn matrix_covers_every_forward_edge() {
        let matrix = GatePolicy::matrix(Strategy::Standard, Risk::Low);
        let edges: Vec<_> = matrix.iter().map(|(from, to, _)| (*from, *to)).collect();
        assert_eq!(edges, FORWARD_EDGES.to_vec());
    }
}
