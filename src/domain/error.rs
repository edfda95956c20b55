//! Domain error types.

use crate::domain::rule::UnknownRule;
use std::path::PathBuf;

/// Top-level error type for stockpick.
///
/// Only global failures surface through this type; problems with a single
/// instrument's data are reported per instrument by the scan orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum StockpickError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    UnknownRule(#[from] UnknownRule),

    #[error("{what} not found: {}", path.display())]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("name registry error: {reason}")]
    Registry { reason: String },

    #[error("failed to write results: {reason}")]
    Output { reason: String },

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockpickError> for std::process::ExitCode {
    fn from(err: &StockpickError) -> Self {
        let code: u8 = match err {
            StockpickError::Io(_) | StockpickError::Output { .. } => 1,
            StockpickError::ConfigParse { .. }
            | StockpickError::ConfigMissing { .. }
            | StockpickError::ConfigInvalid { .. } => 2,
            StockpickError::MissingPath { .. }
            | StockpickError::DataSource { .. }
            | StockpickError::Registry { .. } => 3,
            StockpickError::UnknownRule(_) => 4,
            StockpickError::WorkerPool { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
