//! Diff command
//!
//! Usage: jobdelta diff --committed <FILE> --desired <FILE> [--kind <KIND>] [--open <FILE>]

use clap::Args;
use jobdelta_core::normalize::{self, JobRecord};
use jobdelta_core::{
    build_change_order, diff_job, ChangeOrder, ChangeOrderKind, ChangeOrderRequest, EngineConfig,
};
use serde::Serialize;
use std::path::PathBuf;

use super::{emit, load_change_order, load_job, read_json};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Committed job record (JSON)
    #[arg(long)]
    pub committed: PathBuf,

    /// Desired job record (JSON)
    #[arg(long)]
    pub desired: PathBuf,

    /// Package the deltas as a change order of this kind
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<ChangeOrderKind>,

    /// The job's open change order record (JSON)
    #[arg(long, requires = "kind")]
    pub open: Option<PathBuf>,

    /// Job id (default: the committed record's id)
    #[arg(long)]
    pub job_id: Option<i64>,

    /// Version of the committed record the diff is taken against
    #[arg(long, default_value_t = 0)]
    pub version: u64,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_kind(s: &str) -> Result<ChangeOrderKind, String> {
    ChangeOrderKind::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ChangeOrderKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown change order kind '{}' (expected one of: {})", s, known.join(", "))
    })
}

/// A change order with the digest of its delta set
#[derive(Debug, Serialize)]
struct ChangeOrderOutput {
    #[serde(flatten)]
    change_order: ChangeOrder,
    digest: String,
}

/// Execute diff command
pub fn execute(args: DiffArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let record: JobRecord = read_json(&args.committed)?;
    let job_id = args.job_id.or(record.id).unwrap_or_default();
    let committed = normalize::committed_state(record)?;
    let desired = load_job(&args.desired)?;

    let Some(kind) = args.kind else {
        let deltas = diff_job(&committed, &desired)?;
        return emit(&deltas, args.output.as_deref());
    };

    let open = args.open.as_deref().map(load_change_order).transpose()?;
    let request = ChangeOrderRequest {
        kind,
        job_id,
        committed: &committed,
        committed_version: args.version,
        desired: &desired,
        open: open.as_ref(),
    };
    let change_order = build_change_order(request, &config.change_order)?;
    tracing::info!(
        job_id = job_id,
        change_order_kind = kind.as_str(),
        delta_count = change_order.deltas.len(),
        "change order built"
    );

    let digest = change_order.digest()?;
    emit(
        &ChangeOrderOutput {
            change_order,
            digest,
        },
        args.output.as_deref(),
    )
}
