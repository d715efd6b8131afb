//! Error types for tag contact analysis

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or analysing a session
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Tag ids missing in position data: {}", join_ids(missing))]
    MissingIdentifier { missing: BTreeSet<String> },

    #[error("Unknown tag id: {0}")]
    UnknownIdentifier(String),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Series length mismatch: {context} ({left} vs {right} samples)")]
    LengthMismatch {
        context: String,
        left: usize,
        right: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No contact intervals found")]
    EmptyIntervalSet,
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().cloned().collect::<Vec<_>>().join(", ")
}
