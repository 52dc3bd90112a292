// src/error.rs
//
// Error types for the classification pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the analysis of a single file.
///
/// These are the only failures that escape audio ingestion. The analyzer
/// converts them into an error-carrying `AnalysisResult` at its public
/// boundary, so callers of `SampleAnalyzer::analyze` never see them directly.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File is missing or cannot be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No available decoder could parse the content
    #[error("cannot decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Why an ensemble method did not cast a vote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Abstained {
    /// Method is not enabled on this host or in the current mode
    #[error("method unavailable")]
    Unavailable,

    /// Signal carries nothing the method can work with (silence, too short)
    #[error("insufficient signal: {0}")]
    InsufficientSignal(String),

    /// Method ran but failed
    #[error("method failed: {0}")]
    Failed(String),

    /// Method panicked and was contained
    #[error("method panicked: {0}")]
    Panicked(String),
}

impl Abstained {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientSignal(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

pub type MethodResult<T> = std::result::Result<T, Abstained>;
