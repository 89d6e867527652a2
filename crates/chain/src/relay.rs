//! Private relay (Flashbots-style) bundle submission.
//!
//! Bundles are authenticated with a reputation key that never holds funds:
//! `X-Flashbots-Signature: <address>:<personal_sign(hex(keccak256(body)))>`.

use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ChainError;

const RELAY_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Networks with a known private relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayNetwork {
    Mainnet,
    Goerli,
}

impl RelayNetwork {
    /// Resolve a network name. Anything not listed is an error; there is no
    /// default relay.
    pub fn from_network(name: &str) -> Result<Self, ChainError> {
        match name {
            "mainnet" => Ok(Self::Mainnet),
            "goerli" => Ok(Self::Goerli),
            other => Err(ChainError::UnsupportedNetwork(other.to_string())),
        }
    }

    pub fn relay_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://relay.flashbots.net",
            Self::Goerli => "https://relay-goerli.flashbots.net",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Goerli => "goerli",
        }
    }
}

/// `eth_sendBundle` parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRequest {
    /// Signed raw transactions, 0x-prefixed hex
    pub txs: Vec<String>,
    /// Target block, 0x-prefixed hex
    pub block_number: String,
}

impl BundleRequest {
    /// A bundle of exactly one transaction valid only in `target_block`.
    pub fn single(raw_tx: &Bytes, target_block: u64) -> Self {
        Self {
            txs: vec![format!("0x{}", hex::encode(raw_tx))],
            block_number: format!("0x{:x}", target_block),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
    bundle_hash: B256,
}

/// HTTP client for a private relay.
pub struct RelayClient {
    http: reqwest::Client,
    network: RelayNetwork,
    /// Reputation identity, distinct from the funds-holding signer
    auth: PrivateKeySigner,
}

impl RelayClient {
    pub fn new(network: RelayNetwork, auth: PrivateKeySigner) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder().timeout(RELAY_HTTP_TIMEOUT).build()?;

        info!(
            relay = network.relay_url(),
            network = network.name(),
            auth = %auth.address(),
            "Private relay client initialized"
        );

        Ok(Self { http, network, auth })
    }

    /// Client with a freshly generated reputation key.
    pub fn with_ephemeral_identity(network: RelayNetwork) -> Result<Self, ChainError> {
        Self::new(network, PrivateKeySigner::random())
    }

    pub fn auth_address(&self) -> Address {
        self.auth.address()
    }

    /// Submit a single-transaction bundle for `target_block`. Returns the
    /// relay's bundle hash.
    pub async fn send_bundle(&self, raw_tx: &Bytes, target_block: u64) -> Result<B256, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_sendBundle",
            params: [BundleRequest::single(raw_tx, target_block)],
        };
        let body = serde_json::to_string(&request)?;
        let signature = self.sign_body(&body).await?;

        debug!(target_block, relay = self.network.relay_url(), "Posting bundle");

        let response = self
            .http
            .post(self.network.relay_url())
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ChainError::RelayRejected(format!("{status}: {text}")));
        }

        let parsed: JsonRpcResponse<SendBundleResult> = serde_json::from_str(&text)?;
        if let Some(error) = parsed.error {
            return Err(ChainError::RelayRejected(format!("{}: {}", error.code, error.message)));
        }
        let result = parsed
            .result
            .ok_or_else(|| ChainError::RelayRejected("response has no result".to_string()))?;

        info!(bundle_hash = %result.bundle_hash, target_block, "Bundle accepted by relay");
        Ok(result.bundle_hash)
    }

    /// Header value authenticating `body` with the reputation key.
    async fn sign_body(&self, body: &str) -> Result<String, ChainError> {
        let digest = format!("0x{}", hex::encode(keccak256(body.as_bytes())));
        let signature = self
            .auth
            .sign_message(digest.as_bytes())
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok(format!(
            "{:?}:0x{}",
            self.auth.address(),
            hex::encode(signature.as_bytes())
        ))
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("network", &self.network)
            .field("auth", &self.auth.address())
            .finish_non_exhaustive()
    }
}
