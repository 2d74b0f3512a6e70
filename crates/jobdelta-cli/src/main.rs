//! JobDelta CLI
//!
//! Command-line front end for the reconciliation engine. Every command reads
//! JSON records from files and writes JSON to stdout (or `--output`).

use clap::{Parser, Subcommand};
use jobdelta_core::logging_facility;
use jobdelta_core::{EngineConfig, ExError, JobDeltaError};
use jobdelta_core_types::RequestContext;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "jobdelta")]
#[command(about = "JobDelta - change-order reconciliation for home configurations", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diff a committed job against a desired one, optionally as a change order
    Diff(commands::diff::DiffArgs),
    /// Replay deltas onto a committed job
    Apply(commands::apply::ApplyArgs),
    /// Effective state of a job with its open change order
    Restore(commands::apply::RestoreArgs),
    /// Resolve locked-in choices and their option rules
    Locks(commands::locks::LocksArgs),
}

fn main() {
    let cli = Cli::parse();
    let ctx = RequestContext::new();

    if let Err(e) = run(cli, &ctx) {
        eprintln!("Error: {:#}", e);
        if let Some(report) = engine_report(&e, &ctx) {
            tracing::error!(
                err_code = report.code(),
                request_id = %ctx.request_id,
                "{}",
                report
            );
            eprintln!("  code: {} (request_id: {})", report.code(), ctx.request_id);
        }
        std::process::exit(1);
    }
}

/// Structured report for a failure raised by the engine, if it was one
fn engine_report(err: &anyhow::Error, ctx: &RequestContext) -> Option<ExError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<JobDeltaError>())
        .map(|engine_err| ExError::from(engine_err.clone()).with_context(ctx))
}

fn run(cli: Cli, ctx: &RequestContext) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    logging_facility::init_with_filter(config.logging.profile, config.logging.filter.as_deref());

    let span = tracing::info_span!("request", request_id = %ctx.request_id);
    let _guard = span.enter();

    match cli.command {
        Commands::Diff(args) => commands::diff::execute(args, &config),
        Commands::Apply(args) => commands::apply::execute(args),
        Commands::Restore(args) => commands::apply::execute_restore(args),
        Commands::Locks(args) => commands::locks::execute(args),
    }
}
