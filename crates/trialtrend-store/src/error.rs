use std::path::PathBuf;

use thiserror::Error;
use trialtrend_core::IntegrityError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsupported table format: {0} (expected .csv or .parquet)")]
    UnsupportedFormat(PathBuf),

    #[error("missing or mistyped column: {0}")]
    MissingColumn(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
