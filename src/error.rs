use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CuratorError {
    #[error("malformed PRIDE identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid download format: {0} (expected raw, mgf or mgf.gz)")]
    InvalidFormat(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("PRIDE request failed: {0}")]
    PrideHttp(String),

    #[error("could not connect to PRIDE: {0}")]
    PrideConnection(String),

    #[error("PRIDE returned status {status}: {message}")]
    PrideStatus { status: u16, message: String },

    #[error("failed to parse project metadata: {0}")]
    MetadataParse(String),

    #[error("project metadata has no {0} link")]
    MissingLink(String),

    #[error("no reachable transfer URL, last candidate {url}: {reason}")]
    UnreachableUrl { url: String, reason: String },

    #[error("dataset not found in archive index: {0}")]
    DatasetNotFound(String),

    #[error("archive request failed: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CuratorError {
    /// Network-level failures that permit falling back to a cached copy.
    pub fn is_connection(&self) -> bool {
        matches!(self, CuratorError::PrideConnection(_))
    }
}
