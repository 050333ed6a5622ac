mod cli;
mod commands;
mod ui;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    stagegate::telemetry::init_logging(cli.verbose);

    if let Err(e) = commands::run(cli).await {
        ui::Palette::default().error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
