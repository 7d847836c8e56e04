use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against the remote catalog.
///
/// Each variant corresponds to a distinct outcome of a poster fetch, so the
/// caller can map it without inspecting messages.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Errors raised while reading a source table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },
    #[error("{}: missing required column '{column}'. Available columns: {available:?}", path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },
    #[error("{}: failed to read record near line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: u64,
        source: csv::Error,
    },
    #[error("{} line {line}: {message}", path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

impl TableError {
    /// Whether the error concerns a single row (skippable) rather than the
    /// table as a whole.
    pub fn is_row_level(&self) -> bool {
        matches!(self, TableError::InvalidRow { .. })
    }
}
