mod agents;
mod cli;
mod config;
mod diagnostics;
mod error;
mod host;
mod mapper;
mod model;
mod notify;
#[cfg(test)]
mod testing;
mod utils;
mod workflow;

use agents::Outcome;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;
use workflow::App;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "psmodman=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(Outcome::Failed) => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> error::Result<Outcome> {
    let app = App::new(&cli)?;

    let outcome = match &cli.command {
        Commands::Check => workflow::execute_check(&app).await,
        Commands::List => workflow::execute_list(&app).await,
        Commands::Update {
            names,
            all,
            interactive,
        } => workflow::execute_update(&app, names, *all, *interactive).await,
        Commands::Notes { name } => workflow::execute_notes(&app, name).await,
        Commands::Open { name } => workflow::execute_open(&app, name).await,
    };

    app.finish().await?;
    outcome
}
