use anyhow::{Context, Result};

use stagegate::{
    FileStore, GatePolicy, GateStatus, JobSource, MemoryStore, RiskClassification, StagegateConfig,
    StateGraph, Strategy, TransitionService,
};

use crate::cli::{Cli, Command};
use crate::ui::{Palette, PipelineProgress};

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = StagegateConfig::load().context("failed to load stagegate.toml")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    let ui = Palette::default();

    match cli.command {
        Command::Create {
            description,
            strategy,
            risk,
        } => {
            let job = open(&config)
                .store()
                .create_job(
                    description,
                    strategy.unwrap_or(config.default_strategy),
                    risk.unwrap_or(config.default_risk),
                )
                .await?;
            println!("{}", job.id);
        }
        Command::Gate { job, gate, status } => {
            open(&config).store().record_gate(&job, gate, status).await?;
            ui.success(&format!("{gate} = {status}"));
        }
        Command::Next { job } => {
            let service = open(&config);
            let snapshot = service.store().load_job(&job).await?;
            let verdicts = service.list_valid_transitions(&job).await?;
            ui.print_verdicts(&snapshot, &verdicts);
        }
        Command::Advance { job, target } => {
            let advanced = open(&config)
                .request_transition_retrying(&job, target, &config.retry_config())
                .await?;
            ui.success(&format!(
                "{} is now {} (version {})",
                advanced.id, advanced.state, advanced.version
            ));
        }
        Command::Status { job: Some(job) } => {
            let service = open(&config);
            let snapshot = service.store().load_job(&job).await?;
            let records = service.store().gate_records(&job).await?;
            ui.print_job(&snapshot, &records);
        }
        Command::Status { job: None } => {
            let service = open(&config);
            let mut jobs = service.store().jobs().await?;
            if jobs.is_empty() {
                println!("No jobs in {}", service.store().path().display());
            }
            jobs.sort_by_key(|job| job.created_at);
            for job in &jobs {
                ui.print_job_line(job);
            }
        }
        Command::Policy { strategy, risk } => {
            let strategy = strategy.unwrap_or(config.default_strategy);
            let risk = risk.unwrap_or(config.default_risk);
            ui.print_matrix(strategy, risk, &GatePolicy::matrix(strategy, risk));
        }
        Command::Demo => demo(&ui).await?,
    }
    Ok(())
}

fn open(config: &StagegateConfig) -> TransitionService<FileStore> {
    TransitionService::new(FileStore::new(&config.store_path))
}

/// Walk a high-risk fast-track job from INTAKE to DONE, passing exactly the
/// gates each step reports missing.
async fn demo(ui: &Palette) -> Result<()> {
    let service = TransitionService::new(MemoryStore::new());
    let store = service.store();
    let description = "Harden payment webhook handling";
    let job = store
        .create_job(description, Strategy::FastTrack, RiskClassification::High)
        .await;

    let steps = StateGraph::forward_path().len() as u64 - 1;
    let progress = PipelineProgress::start(steps, description);

    let mut current = job.clone();
    while let Some(next) = StateGraph::successor(current.state) {
        let verdicts = service.list_valid_transitions(&job.id).await?;
        let forward = verdicts
            .iter()
            .find(|verdict| verdict.target == next)
            .context("forward edge missing from verdicts")?;
        for gate in &forward.missing_gates {
            store.record_gate(&job.id, *gate, GateStatus::Pass).await?;
            progress.gate_passed(gate.as_str());
        }
        current = service.request_transition(&job.id, next).await?;
        progress.advanced(&current);
    }
    progress.finish();

    let records = store.gate_records(&job.id).await?;
    ui.print_job(&current, &records);
    Ok(())
}
