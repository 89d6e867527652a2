//! Error types for the bot core.
//!
//! Startup failures are [`ConfigError`] and end the process. Everything a
//! cycle can hit is wrapped in [`PipelineError`] and handled by the scheduler.

use alloy::primitives::B256;
use liquidator_chain::ChainError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal startup failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("deployment `{deployment}` is not configured for network `{network}`")]
    UnknownDeployment { network: String, deployment: String },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure reading chain state. Always retryable on a later cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Failure delivering an action.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Chain(ChainError),

    #[error("submission timed out after {0:?}")]
    Timeout(Duration),

    #[error("relay rejected bundle: {0}")]
    RelayRejected(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("nothing to submit")]
    NoAction,
}

impl From<ChainError> for SubmissionError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::RelayRejected(reason) => Self::RelayRejected(reason),
            ChainError::Reverted(hash) => Self::Reverted(hash),
            other => Self::Chain(other),
        }
    }
}

/// Any failure of one scan-and-act pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),
}
