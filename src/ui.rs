//! Terminal rendering: colored verdicts, job summaries and the demo progress
//! bar.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use stagegate::store::GateRecords;
use stagegate::{GateSet, GateStatus, Job, RiskClassification, State, Strategy, TransitionVerdict};

pub struct Palette {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }
}

impl Palette {
    pub fn print_verdicts(&self, job: &Job, verdicts: &[TransitionVerdict]) {
        println!(
            "{} {} ({}, {} risk)",
            self.bold.apply_to(&job.id),
            job.state,
            job.strategy,
            job.risk
        );
        if verdicts.is_empty() {
            println!("  {} {} is terminal", self.dim.apply_to("·"), job.state);
            return;
        }
        for verdict in verdicts {
            if verdict.allowed {
                println!("  {} {}", self.green.apply_to("✓"), verdict.target);
            } else {
                println!(
                    "  {} {}  missing: {}",
                    self.red.apply_to("✗"),
                    verdict.target,
                    self.yellow.apply_to(gate_list(&verdict.missing_gates))
                );
            }
        }
    }

    pub fn print_job(&self, job: &Job, records: &GateRecords) {
        println!("{}", self.bold.apply_to(&job.id));
        println!("  description: {}", job.description);
        println!("  state:       {} (version {})", job.state, job.version);
        println!("  strategy:    {}", job.strategy);
        println!("  risk:        {}", job.risk);
        if !records.is_empty() {
            println!("  gates:");
            for (gate, status) in records {
                let style = match status {
                    GateStatus::Pass => &self.green,
                    GateStatus::Fail => &self.red,
                    GateStatus::Pending => &self.yellow,
                };
                println!("    {:<24} {}", gate.as_str(), style.apply_to(status));
            }
        }
        if !job.history.is_empty() {
            println!("  history:");
            for change in &job.history {
                println!(
                    "    v{:<3} {} -> {}  {}",
                    change.version,
                    change.from,
                    change.to,
                    self.dim.apply_to(change.at.format("%Y-%m-%d %H:%M:%S"))
                );
            }
        }
    }

    pub fn print_job_line(&self, job: &Job) {
        let style = match job.state {
            State::Done => &self.green,
            State::Cancelled => &self.red,
            _ => &self.yellow,
        };
        println!(
            "{}  {} {}",
            self.dim.apply_to(&job.id),
            style.apply_to(format!("{:<10}", job.state.to_string())),
            job.description
        );
    }

    pub fn print_matrix(
        &self,
        strategy: Strategy,
        risk: RiskClassification,
        rows: &[(State, State, GateSet)],
    ) {
        println!(
            "{}",
            self.bold.apply_to(format!("{strategy} / {risk} risk"))
        );
        for (from, to, gates) in rows {
            let edge = format!("{from} -> {to}");
            println!("  {edge:<22} {}", gate_list(gates));
        }
        println!("  {:<22} {}", "* -> CANCELLED", self.dim.apply_to("none"));
    }

    pub fn success(&self, message: &str) {
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn error(&self, message: &str) {
        eprintln!("  {} {message}", self.red.apply_to("✗"));
    }
}

fn gate_list(gates: &GateSet) -> String {
    if gates.is_empty() {
        "none".to_string()
    } else {
        gates.iter().map(|g| g.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// Progress bar for a job walking the pipeline.
pub struct PipelineProgress {
    pb: ProgressBar,
}

impl PipelineProgress {
    pub fn start(stages: u64, description: &str) -> Self {
        let pb = ProgressBar::new(stages);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(format!("INTAKE: {description}"));
        Self { pb }
    }

    pub fn gate_passed(&self, gate: &str) {
        self.pb.println(format!("    gate passed: {gate}"));
    }

    pub fn advanced(&self, job: &Job) {
        self.pb.inc(1);
        self.pb.set_message(job.state.to_string());
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
