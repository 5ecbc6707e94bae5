//! Harness error type.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop the harness before a verdict is reached.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported function '{0}'")]
    UnknownFunction(String),
    #[error("unsupported target spec '{0}'")]
    BadTarget(String),
    #[error("case input is missing field '{0}'")]
    MissingInput(&'static str),
    #[error("unknown locale '{0}'")]
    UnknownLocale(String),
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    #[error("no fixture json files found in {}", .0.display())]
    NoFixtures(PathBuf),
}
