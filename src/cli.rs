//! Command line interface.
//!
//! [`Cli`] carries the global flags (`--store`, `--verbose`) and one
//! [`Command`] per operator action.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use stagegate::{GateStatus, GateType, RiskClassification, State, Strategy};

/// stagegate: gate-checked transitions for delivery pipeline jobs.
#[derive(Debug, Parser)]
#[command(name = "stagegate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Job store file (overrides stagegate.toml and STAGEGATE_STORE).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Debug-level logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a job in INTAKE.
    Create {
        /// What the job delivers.
        description: String,

        /// STANDARD or FAST_TRACK.
        #[arg(long)]
        strategy: Option<Strategy>,

        /// LOW, STANDARD or HIGH.
        #[arg(long)]
        risk: Option<RiskClassification>,
    },

    /// Record a gate outcome for a job.
    Gate {
        job: String,

        /// Gate type, e.g. code_review.
        gate: GateType,

        #[arg(long, default_value = "pass")]
        status: GateStatus,
    },

    /// Show what can happen next for a job.
    Next { job: String },

    /// Move a job to a target state.
    Advance { job: String, target: State },

    /// Show one job, or all jobs.
    Status { job: Option<String> },

    /// Print the required-gate matrix.
    Policy {
        #[arg(long)]
        strategy: Option<Strategy>,

        #[arg(long)]
        risk: Option<RiskClassification>,
    },

    /// Walk an in-memory job through the whole pipeline.
    Demo,
}
