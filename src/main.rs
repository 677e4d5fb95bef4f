mod apply;
mod categorize;
mod classify;
mod config;
mod db;
mod error;
mod import;
mod ledger;
mod models;
mod review;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = run::Cli::parse();
    let config = config::Config::from_env();
    init_tracing(config.log_filter());
    run::execute(cli, &config)
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
