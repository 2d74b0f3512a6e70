//! Locks command
//!
//! Usage: jobdelta locks --committed <FILE> --mapping <FILE> [--change-order <FILE>]...

use clap::Args;
use jobdelta_core::{resolve_locked_choices, HistoricOptionMapping};
use std::path::PathBuf;

use super::{emit, load_change_order, load_job, read_json};

#[derive(Debug, Args)]
pub struct LocksArgs {
    /// Committed job record (JSON)
    #[arg(long)]
    pub committed: PathBuf,

    /// Historic option mapping: a JSON array of option rules
    #[arg(long)]
    pub mapping: PathBuf,

    /// Change order record of the job (JSON); repeat for each order
    #[arg(long = "change-order")]
    pub change_orders: Vec<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute locks command
pub fn execute(args: LocksArgs) -> anyhow::Result<()> {
    let committed = load_job(&args.committed)?;
    let mapping: HistoricOptionMapping = read_json(&args.mapping)?;
    let change_orders = args
        .change_orders
        .iter()
        .map(|p| load_change_order(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let resolution = resolve_locked_choices(&committed, &change_orders, &mapping)?;
    for warning in &resolution.warnings {
        tracing::warn!(warning = ?warning, "lock resolution warning");
    }
    emit(&resolution, args.output.as_deref())
}
