use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StagegateError;

/// Pipeline stages a job moves through.
///
/// Each job flows: INTAKE → PLANNING → DESIGN → BUILD → TEST → SECURITY →
/// RELEASE → DONE, and may leave for CANCELLED from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Intake,
    Planning,
    Design,
    Build,
    Test,
    Security,
    Release,
    Done,
    Cancelled,
}

impl State {
    pub const ALL: [State; 9] = [
        State::Intake,
        State::Planning,
        State::Design,
        State::Build,
        State::Test,
        State::Security,
        State::Release,
        State::Done,
        State::Cancelled,
    ];

    /// `DONE` and `CANCELLED` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Done | State::Cancelled)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Intake => write!(f, "INTAKE"),
            State::Planning => write!(f, "PLANNING"),
            State::Design => write!(f, "DESIGN"),
            State::Build => write!(f, "BUILD"),
            State::Test => write!(f, "TEST"),
            State::Security => write!(f, "SECURITY"),
            State::Release => write!(f, "RELEASE"),
            State::Done => write!(f, "DONE"),
            State::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for State {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s).to_ascii_uppercase();
        State::ALL
            .into_iter()
            .find(|state| state.to_string() == wanted)
            .ok_or_else(|| StagegateError::UnknownState(s.to_string()))
    }
}

/// Execution mode selecting which gate template applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    #[default]
    Standard,
    FastTrack,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Standard, Strategy::FastTrack];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Standard => write!(f, "STANDARD"),
            Strategy::FastTrack => write!(f, "FAST_TRACK"),
        }
    }
}

impl FromStr for Strategy {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(Strategy::Standard),
            "FAST_TRACK" => Ok(Strategy::FastTrack),
            _ => Err(StagegateError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Risk tier of a job. Ordered: `Low < Standard < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClassification {
    #[default]
    Low,
    Standard,
    High,
}

impl RiskClassification {
    pub const ALL: [RiskClassification; 3] = [
        RiskClassification::Low,
        RiskClassification::Standard,
        RiskClassification::High,
    ];
}

impl fmt::Display for RiskClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskClassification::Low => write!(f, "LOW"),
            RiskClassification::Standard => write!(f, "STANDARD"),
            RiskClassification::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for RiskClassification {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskClassification::Low),
            "STANDARD" => Ok(RiskClassification::Standard),
            "HIGH" => Ok(RiskClassification::High),
            _ => Err(StagegateError::UnknownRisk(s.to_string())),
        }
    }
}

/// Approval checks that gate forward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    IntakeBriefApproved,
    PlanApproved,
    ArchitectureReview,
    CodeReview,
    QaSignoff,
    SecurityAudit,
    ComplianceReview,
    ReleaseSignoff,
}

impl GateType {
    pub const ALL: [GateType; 8] = [
        GateType::IntakeBriefApproved,
        GateType::PlanApproved,
        GateType::ArchitectureReview,
        GateType::CodeReview,
        GateType::QaSignoff,
        GateType::SecurityAudit,
        GateType::ComplianceReview,
        GateType::ReleaseSignoff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GateType::IntakeBriefApproved => "intake_brief_approved",
            GateType::PlanApproved => "plan_approved",
            GateType::ArchitectureReview => "architecture_review",
            GateType::CodeReview => "code_review",
            GateType::QaSignoff => "qa_signoff",
            GateType::SecurityAudit => "security_audit",
            GateType::ComplianceReview => "compliance_review",
            GateType::ReleaseSignoff => "release_signoff",
        }
    }
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for GateType {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s).to_ascii_lowercase();
        GateType::ALL
            .into_iter()
            .find(|gate| gate.as_str() == wanted)
            .ok_or_else(|| StagegateError::UnknownGateType(s.to_string()))
    }
}

/// Status of one gate record. Only `Pass` counts towards a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    #[default]
    Pending,
    Pass,
    Fail,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Pending => write!(f, "PENDING"),
            GateStatus::Pass => write!(f, "PASS"),
            GateStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for GateStatus {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(GateStatus::Pending),
            "PASS" => Ok(GateStatus::Pass),
            "FAIL" => Ok(GateStatus::Fail),
            _ => Err(StagegateError::UnknownGateStatus(s.to_string())),
        }
    }
}

/// Ordered set of gate types. Ordering keeps rendered output deterministic.
pub type GateSet = BTreeSet<GateType>;

// Accept `fast-track` as well as `fast_track`.
fn normalize(s: &str) -> String {
    s.trim().replace('-', "_")
}
