//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a hybrid classification run.
///
/// Schema anomalies in classifier output are never reported here; the
/// normalizer repairs them. Everything below originates outside the core.
#[derive(Debug, Error)]
pub enum HybridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed table: {0}")]
    Tsv(#[from] csv::Error),

    #[error("required input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{tool} failed with exit code {status}: {stderr}")]
    Upstream {
        tool: String,
        status: i32,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, HybridError>;
