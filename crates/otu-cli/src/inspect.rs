//! Offline checks over OTU documents

use anyhow::Context;
use otu_core::{verify, Issues};
use otu_model::{diff, DiffOp, JoinedOtu};
use serde_json::Value;
use std::path::Path;

/// Read a JSON document
///
/// # Errors
/// Unreadable file or invalid JSON
pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Value> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Consistency issues of a joined OTU document, `None` when it verifies
///
/// # Errors
/// Documents that do not have the joined OTU shape
pub fn verify_document(document: Value) -> anyhow::Result<Option<Issues>> {
    let otu = JoinedOtu::from_document(document).context("not a joined otu document")?;
    Ok(verify(&otu))
}

/// Structural changes turning `old` into `new`
#[must_use]
pub fn diff_documents(old: &Value, new: &Value) -> Vec<DiffOp> {
    diff(old, new)
}
