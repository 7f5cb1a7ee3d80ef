use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;

use crate::errors::RecordError;

/// Exported IOL measurement record, kept as raw JSON.
///
/// Accessors never fail: absent or non-scalar fields read as empty strings,
/// so a partially filled export still drives a partial form fill.
#[derive(Debug, Clone)]
pub struct ExportRecord {
    root: Value,
}

impl ExportRecord {
    /// Reads and parses the record file, keeping missing-file, unreadable
    /// and malformed cases distinct.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => RecordError::NotFound {
                path: path.to_path_buf(),
            },
            _ => RecordError::Unreadable {
                path: path.to_path_buf(),
                source: err,
            },
        })?;
        Self::from_json(&raw).map_err(|source| RecordError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let root = serde_json::from_str(raw)?;
        Ok(Self { root })
    }

    /// Top-level scalar as text. Strings pass through, numbers and booleans
    /// render in their JSON form, anything else reads as empty.
    pub fn scalar(&self, key: &str) -> String {
        self.scalar_opt(key).unwrap_or_default()
    }

    /// Like [`scalar`](Self::scalar), but `None` when the key is absent so
    /// callers can tell a missing key from a present empty value.
    pub fn scalar_opt(&self, key: &str) -> Option<String> {
        self.root.get(key).map(|node| scalar_text(Some(node)))
    }

    /// Raw measurement string at `iolData.<group>.<key>`.
    pub fn measurement(&self, group: &str, key: &str) -> String {
        let node = self
            .root
            .get("iolData")
            .and_then(|v| v.get(group))
            .and_then(|v| v.get(key));
        scalar_text(node)
    }
}

fn scalar_text(node: Option<&Value>) -> String {
    match node {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
