pub mod apply;
pub mod diff;
pub mod locks;

use anyhow::Context;
use jobdelta_core::normalize::{self, ChangeOrderRecord, JobRecord};
use jobdelta_core::{ChangeOrder, CommittedState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read and decode a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("decoding {}", path.display()))
}

/// Canonical job state from a job record file.
pub fn load_job(path: &Path) -> anyhow::Result<CommittedState> {
    let record: JobRecord = read_json(path)?;
    Ok(normalize::committed_state(record)?)
}

/// Typed change order from a change-order record file.
pub fn load_change_order(path: &Path) -> anyhow::Result<ChangeOrder> {
    let record: ChangeOrderRecord = read_json(path)?;
    Ok(normalize::change_order(record)?)
}

/// Pretty-print `value` to `output`, or stdout when no file is given.
pub fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
