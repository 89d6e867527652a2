//! Transaction submission.
//!
//! Both actions encode the same executor call. In direct mode the signed
//! transaction goes to the public mempool; in private relay mode it is
//! bundled for the block after the scan and nothing else.

use alloy::primitives::B256;
use async_trait::async_trait;
use liquidator_chain::{ConfirmedTransaction, LiquidatorContract, RelayClient, SignedTransaction, TransactionSender};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::action::{Action, Receipt, SubmissionContext, SubmissionMode, SubmissionOutcome};
use crate::error::SubmissionError;

/// Delivers a decided action.
///
/// Implementations never retry and never re-target another block.
#[async_trait]
pub trait Submitter: Send + Sync {
    fn context(&self) -> &SubmissionContext;

    /// Submit `action`, decided from the snapshot at `scanned_block`.
    async fn submit(&self, action: &Action, scanned_block: u64) -> Result<SubmissionOutcome, SubmissionError>;

    /// Restore signer state after a `submit` call was cancelled part way.
    async fn resync(&self) {}
}

/// Block a bundle decided at `scanned_block` is built for.
fn bundle_target(scanned_block: u64) -> u64 {
    scanned_block.saturating_add(1)
}

/// Outcome of a bundle once the head has reached `target_block`.
///
/// Only a successful receipt in the target block counts as inclusion.
fn bundle_outcome(
    receipt: Option<ConfirmedTransaction>,
    target_block: u64,
    tx_hash: B256,
) -> Result<SubmissionOutcome, SubmissionError> {
    match receipt {
        Some(receipt) if !receipt.success => Err(SubmissionError::Reverted(receipt.tx_hash)),
        Some(receipt) if receipt.block_number == target_block => Ok(SubmissionOutcome::Confirmed(Receipt {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            mode: SubmissionMode::PrivateRelay,
        })),
        _ => Ok(SubmissionOutcome::NotIncluded { target_block, tx_hash }),
    }
}

/// Anything short of confirmation leaves the cached nonce unreliable.
fn needs_nonce_resync(result: &Result<SubmissionOutcome, SubmissionError>) -> bool {
    !matches!(result, Ok(SubmissionOutcome::Confirmed(_)))
}

/// Submitter over the signing sender and, in relay mode, a relay client.
pub struct ChainSubmitter {
    context: SubmissionContext,
    sender: TransactionSender,
    relay: Option<RelayClient>,
    liquidator: LiquidatorContract,
    inclusion_poll: Duration,
}

impl ChainSubmitter {
    /// Direct mode when `relay` is `None`.
    pub fn new(
        sender: TransactionSender,
        relay: Option<RelayClient>,
        liquidator: LiquidatorContract,
        network: String,
        deployment: String,
        inclusion_poll: Duration,
    ) -> Self {
        let context = SubmissionContext {
            signer: sender.address,
            relay_identity: relay.as_ref().map(|r| r.auth_address()),
            network,
            deployment,
        };

        info!(
            signer = %context.signer,
            mode = context.mode().as_str(),
            liquidator = %liquidator.address,
            "Submitter initialized"
        );

        Self {
            context,
            sender,
            relay,
            liquidator,
            inclusion_poll,
        }
    }

    async fn submit_direct(&self, signed: &SignedTransaction) -> Result<SubmissionOutcome, SubmissionError> {
        let confirmed = self.sender.broadcast(signed).await?;
        Ok(SubmissionOutcome::Confirmed(Receipt {
            tx_hash: confirmed.tx_hash,
            block_number: confirmed.block_number,
            gas_used: confirmed.gas_used,
            mode: SubmissionMode::Direct,
        }))
    }

    async fn submit_bundle(
        &self,
        relay: &RelayClient,
        signed: &SignedTransaction,
        target_block: u64,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let result = self.deliver_bundle(relay, signed, target_block).await;
        if needs_nonce_resync(&result) {
            self.sender.sync_nonce().await;
        }
        result
    }

    async fn deliver_bundle(
        &self,
        relay: &RelayClient,
        signed: &SignedTransaction,
        target_block: u64,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        relay.send_bundle(&signed.raw, target_block).await?;
        self.wait_for_block(target_block).await?;
        let receipt = self.sender.receipt(signed.hash).await?;
        bundle_outcome(receipt, target_block, signed.hash)
    }

    /// Poll the head until it reaches `target_block`.
    async fn wait_for_block(&self, target_block: u64) -> Result<(), SubmissionError> {
        loop {
            if self.sender.block_number().await? >= target_block {
                return Ok(());
            }
            tokio::time::sleep(self.inclusion_poll).await;
        }
    }
}

#[async_trait]
impl Submitter for ChainSubmitter {
    fn context(&self) -> &SubmissionContext {
        &self.context
    }

    #[instrument(skip(self, action), fields(kind = action.kind(), mode = self.context.mode().as_str()))]
    async fn submit(&self, action: &Action, scanned_block: u64) -> Result<SubmissionOutcome, SubmissionError> {
        let (accounts, assets, max_amounts) = action.executor_args().ok_or(SubmissionError::NoAction)?;
        let start = Instant::now();

        let calldata = self
            .liquidator
            .encode_absorb_and_arbitrage(accounts, assets, max_amounts);
        let signed = self.sender.sign(self.liquidator.address, calldata).await?;

        let outcome = match &self.relay {
            None => self.submit_direct(&signed).await,
            Some(relay) => self.submit_bundle(relay, &signed, bundle_target(scanned_block)).await,
        };

        match &outcome {
            Ok(SubmissionOutcome::Confirmed(receipt)) => info!(
                tx_hash = %receipt.tx_hash,
                block = receipt.block_number,
                gas_used = receipt.gas_used,
                elapsed_ms = start.elapsed().as_millis(),
                "Action confirmed"
            ),
            Ok(SubmissionOutcome::NotIncluded { target_block, tx_hash }) => info!(
                target_block,
                tx_hash = %tx_hash,
                "Bundle not included in target block"
            ),
            Err(e) => warn!(error = %e, "Submission failed"),
        }
        outcome
    }

    async fn resync(&self) {
        self.sender.sync_nonce().await;
    }
}

impl std::fmt::Debug for ChainSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSubmitter")
            .field("context", &self.context)
            .field("liquidator", &self.liquidator)
            .finish_non_exhaustive()
    }
}
