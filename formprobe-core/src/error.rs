use formprobe_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read payload file {path}: {source}")]
    Payloads {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Payload file {path} is not a JSON array of strings: {source}")]
    PayloadFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write report to {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize findings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
