use std::path::Path;

use aci_migrate::settings::{load_settings_with_source, AssessmentSettings};
use aci_snapshot::Snapshot;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod analyze_cmd;
mod assess_cmd;
mod cli;
mod configs_cmd;
mod inspect_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Assess(args) => assess_cmd::run_assess(args),
        Command::Analyze(args) => analyze_cmd::run_analyze(args),
        Command::Configs(args) => configs_cmd::run_configs(args),
        Command::Inspect(args) => inspect_cmd::run_inspect(args),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn load_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::load_file(path).with_context(|| format!("failed to load {}", path.display()))
}

pub(crate) fn load_settings(path: Option<&Path>) -> Result<AssessmentSettings> {
    let (settings, source) = load_settings_with_source(path).with_context(|| match path {
        Some(path) => format!("failed to load settings {}", path.display()),
        None => "failed to load embedded settings".to_string(),
    })?;
    debug!(source = %source, "settings loaded");
    Ok(settings)
}
