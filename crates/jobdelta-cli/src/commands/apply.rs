//! Apply and restore commands
//!
//! Usage:
//!   jobdelta apply --committed <FILE> --deltas <FILE>
//!   jobdelta restore --committed <FILE> [--open <FILE>]

use clap::Args;
use jobdelta_core::diff::Delta;
use std::path::PathBuf;

use super::{emit, load_change_order, load_job, read_json};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Committed job record (JSON)
    #[arg(long)]
    pub committed: PathBuf,

    /// Ordered delta list (JSON array)
    #[arg(long)]
    pub deltas: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Committed job record (JSON)
    #[arg(long)]
    pub committed: PathBuf,

    /// The job's open change order record (JSON)
    #[arg(long)]
    pub open: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute apply command
pub fn execute(args: ApplyArgs) -> anyhow::Result<()> {
    let committed = load_job(&args.committed)?;
    let deltas: Vec<Delta> = read_json(&args.deltas)?;

    let effective = jobdelta_core::apply(committed, &deltas)?;
    emit(&effective, args.output.as_deref())
}

/// Execute restore command
pub fn execute_restore(args: RestoreArgs) -> anyhow::Result<()> {
    let committed = load_job(&args.committed)?;
    let open = args.open.as_deref().map(load_change_order).transpose()?;

    let effective = jobdelta_core::restore(committed, open.as_ref())?;
    emit(&effective, args.output.as_deref())
}
