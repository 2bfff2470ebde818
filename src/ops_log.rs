//! Operational record of contact-list forwarding failures.
//!
//! Users never see these failures, so each one is appended to
//! `data/forward_failures.jsonl` for operators, one JSON object per line.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardFailure {
    pub logged_at: DateTime<Utc>,
    /// Contact-list sink that failed.
    pub sink: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub error: String,
}

pub fn append_failure(path: &Path, failure: &ForwardFailure) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create data dir")?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(failure).context("serialize forward failure")?;
    writeln!(file, "{line}").with_context(|| format!("append {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
pub fn read_failures(path: &Path) -> Result<Vec<ForwardFailure>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).context("parse forward failure"))
        .collect()
}
