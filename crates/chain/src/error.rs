//! Error type for the chain interaction layer.

use alloy::primitives::B256;
use thiserror::Error;

/// Failures raised by chain reads, signing and submission.
///
/// Callers decide whether a failure is retryable; nothing in this crate
/// retries on its own.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("pending transaction failed: {0}")]
    Pending(#[from] alloy::providers::PendingTransactionError),

    #[error("invalid endpoint url {url}: {reason}")]
    Url { url: String, reason: String },

    #[error("invalid private key: {0}")]
    Key(String),

    #[error("transaction signing failed: {0}")]
    Signing(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("relay http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay response decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("relay rejected request: {0}")]
    RelayRejected(String),

    #[error("no private relay for network `{0}`")]
    UnsupportedNetwork(String),

    #[error("malformed chain response: {0}")]
    Malformed(String),
}

impl ChainError {
    pub(crate) fn url(url: &str, reason: impl ToString) -> Self {
        Self::Url {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse an RPC endpoint, keeping the offending value in the error.
pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url, ChainError> {
    url.parse().map_err(|e| ChainError::url(url, e))
}
