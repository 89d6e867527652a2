//! Poll scheduler: the top-level control loop.
//!
//! One cycle: refresh the collateral set when due, read the head, and on a
//! new height run scan → decide → submit once for that height. Nothing a
//! cycle does can end the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::action::{Action, SubmissionOutcome};
use crate::assets::AssetRegistry;
use crate::config::SchedulerTimingConfig;
use crate::error::{PipelineError, SubmissionError};
use crate::evaluator::Evaluator;
use crate::reader::StateReader;
use crate::submitter::Submitter;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep after a waiting or failed cycle
    pub loop_delay: Duration,
    /// Cycles between collateral set refreshes
    pub asset_refresh_cycles: u64,
    /// Bound on one submission
    pub submit_timeout: Duration,
    /// Re-read the head before submitting and drop stale decisions
    pub skip_stale_decisions: bool,
}

impl From<&SchedulerTimingConfig> for SchedulerConfig {
    fn from(timing: &SchedulerTimingConfig) -> Self {
        Self {
            loop_delay: timing.loop_delay(),
            asset_refresh_cycles: timing.asset_refresh_cycles,
            submit_timeout: timing.submit_timeout(),
            skip_stale_decisions: timing.skip_stale_decisions,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerTimingConfig::default())
    }
}

/// What one scan-and-act run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    NoAction,
    Submitted {
        action: Action,
        outcome: SubmissionOutcome,
    },
    /// The head moved past the scanned block before submission.
    Stale { action: Action, scanned: u64, head: u64 },
}

/// What one cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The head is not above the highest processed height.
    Waited { block: u64 },
    Processed { block: u64, outcome: PipelineOutcome },
    /// `block` is `None` when the head itself could not be read.
    Failed { block: Option<u64>, error: PipelineError },
}

impl CycleOutcome {
    /// Whether the loop should sleep before the next cycle.
    pub fn should_sleep(&self) -> bool {
        !matches!(self, CycleOutcome::Processed { .. })
    }
}

/// The control loop and all state it owns.
pub struct Scheduler {
    reader: StateReader,
    registry: AssetRegistry,
    evaluator: Evaluator,
    submitter: Arc<dyn Submitter>,
    config: SchedulerConfig,
    last_block: Option<u64>,
    cycles_since_refresh: u64,
}

impl Scheduler {
    pub fn new(
        reader: StateReader,
        registry: AssetRegistry,
        evaluator: Evaluator,
        submitter: Arc<dyn Submitter>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            reader,
            registry,
            evaluator,
            submitter,
            config,
            last_block: None,
            cycles_since_refresh: 0,
        }
    }

    /// Highest height a pipeline was started for.
    pub fn last_block(&self) -> Option<u64> {
        self.last_block
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Loop forever. Only process termination stops it.
    pub async fn run(&mut self) {
        info!(
            mode = self.submitter.context().mode().as_str(),
            network = %self.submitter.context().network,
            deployment = %self.submitter.context().deployment,
            loop_delay_ms = self.config.loop_delay.as_millis(),
            "Starting poll loop"
        );

        loop {
            let outcome = self.tick().await;
            if outcome.should_sleep() {
                tokio::time::sleep(self.config.loop_delay).await;
            }
        }
    }

    /// Run exactly one cycle.
    pub async fn tick(&mut self) -> CycleOutcome {
        self.refresh_assets_if_due().await;
        self.cycles_since_refresh += 1;

        let block = match self.reader.block_number().await {
            Ok(block) => block,
            Err(e) => {
                error!(error = %e, "Failed to read block number");
                return CycleOutcome::Failed {
                    block: None,
                    error: e.into(),
                };
            }
        };

        if let Some(last) = self.last_block.filter(|last| block <= *last) {
            if block < last {
                warn!(block, last, "Head is behind the last processed block");
            } else {
                debug!(block, "Waiting for new block");
            }
            return CycleOutcome::Waited { block };
        }

        info!(block, previous = ?self.last_block, "New block detected");
        // Recorded before the pipeline runs: a failing height is not retried.
        self.last_block = Some(block);

        match self.scan_and_act(block).await {
            Ok(outcome) => CycleOutcome::Processed { block, outcome },
            Err(error) => {
                error!(block, error = %error, "Scan-and-act failed");
                CycleOutcome::Failed {
                    block: Some(block),
                    error,
                }
            }
        }
    }

    async fn refresh_assets_if_due(&mut self) {
        let due = !self.registry.is_populated()
            || self.cycles_since_refresh >= self.config.asset_refresh_cycles;
        if !due {
            return;
        }

        info!(cycles = self.cycles_since_refresh, "Refreshing assets");
        match self.registry.refresh(&self.reader).await {
            Ok(_) => self.cycles_since_refresh = 0,
            Err(e) => warn!(
                error = %e,
                kept = self.registry.len(),
                "Asset refresh failed, keeping previous set"
            ),
        }
    }

    #[instrument(skip(self))]
    async fn scan_and_act(&self, block: u64) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let scan = self.reader.scan(block).await?;
        let assets = self.registry.current();

        let action = self.evaluator.decide(&scan, &assets);
        debug!(action = %action, decide_us = start.elapsed().as_micros(), "Decision made");
        if action.is_no_action() {
            return Ok(PipelineOutcome::NoAction);
        }

        if self.config.skip_stale_decisions {
            let head = self.reader.block_number().await?;
            if head > block {
                warn!(scanned = block, head, action = %action, "Head moved on, dropping stale decision");
                return Ok(PipelineOutcome::Stale {
                    action,
                    scanned: block,
                    head,
                });
            }
        }

        info!(action = %action, "Submitting");
        let outcome = match tokio::time::timeout(self.config.submit_timeout, self.submitter.submit(&action, block)).await
        {
            Ok(result) => result?,
            Err(_) => {
                // The cancelled call may have signed without sending
                self.submitter.resync().await;
                return Err(SubmissionError::Timeout(self.config.submit_timeout).into());
            }
        };

        Ok(PipelineOutcome::Submitted { action, outcome })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("last_block", &self.last_block)
            .field("cycles_since_refresh", &self.cycles_since_refresh)
            .field("assets", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArbitrageConfig;
    use crate::error::ScanError;
    use crate::testing::{raw_account, raw_asset, MockChain, MockSubmitter};
    use alloy::primitives::{address, Address};
    use liquidator_chain::RawSnapshot;

    const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    const BORROWER: Address = address!("00000000000000000000000000000000000000b0");

    fn snapshot(block: u64, liquidatable: bool) -> RawSnapshot {
        RawSnapshot {
            block_number: block,
            accounts: vec![raw_account(BORROWER, liquidatable, &[(WETH, 5, 10_000_000_000)])],
            ..Default::default()
        }
    }

    fn scheduler(chain: &Arc<MockChain>, submitter: &Arc<MockSubmitter>, config: SchedulerConfig) -> Scheduler {
        chain.set_asset_infos(Some(vec![raw_asset(WETH, 18, 930_000_000_000_000_000)]));
        Scheduler::new(
            StateReader::new(chain.clone(), Duration::from_secs(1)),
            AssetRegistry::new(),
            Evaluator::new(&ArbitrageConfig::default()),
            submitter.clone(),
            config,
        )
    }

    #[tokio::test]
    async fn test_wait_then_liquidate_on_new_block() {
        let chain = Arc::new(MockChain::new(&[100, 100, 101]));
        chain.set_snapshot(100, snapshot(100, false));
        chain.set_snapshot(101, snapshot(101, true));
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());

        let first = scheduler.tick().await;
        assert!(matches!(
            first,
            CycleOutcome::Processed {
                block: 100,
                outcome: PipelineOutcome::NoAction
            }
        ));

        let second = scheduler.tick().await;
        assert!(matches!(second, CycleOutcome::Waited { block: 100 }));
        assert!(second.should_sleep());

        let action = match scheduler.tick().await {
            CycleOutcome::Processed {
                block: 101,
                outcome: PipelineOutcome::Submitted { action, .. },
            } => action,
            other => panic!("expected a submission at 101, got {other:?}"),
        };
        assert!(matches!(action, Action::Liquidate { account, .. } if account == BORROWER));

        assert_eq!(chain.scanned_blocks(), vec![100, 101]);
        let submissions = submitter.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].1, 101);
    }

    #[tokio::test]
    async fn test_read_failure_does_not_stop_the_loop() {
        let chain = Arc::new(MockChain::new(&[205, 206]));
        // No snapshot at 205: the read fails
        chain.set_snapshot(206, snapshot(206, true));
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());

        let first = scheduler.tick().await;
        assert!(matches!(
            first,
            CycleOutcome::Failed {
                block: Some(205),
                error: PipelineError::Scan(ScanError::Chain(_))
            }
        ));
        assert!(first.should_sleep());

        let second = scheduler.tick().await;
        assert!(matches!(
            second,
            CycleOutcome::Processed {
                block: 206,
                outcome: PipelineOutcome::Submitted { .. }
            }
        ));
        assert_eq!(submitter.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_one_pipeline_per_height() {
        let chain = Arc::new(MockChain::new(&[7, 7, 7, 8, 8, 7]));
        for block in [7, 8] {
            chain.set_snapshot(block, snapshot(block, false));
        }
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());

        for _ in 0..6 {
            scheduler.tick().await;
        }
        assert_eq!(chain.scanned_blocks(), vec![7, 8]);
        assert_eq!(scheduler.last_block(), Some(8));
    }

    #[tokio::test]
    async fn test_lagging_head_does_not_resubmit() {
        let chain = Arc::new(MockChain::new(&[7, 8, 7]));
        for block in [7, 8] {
            chain.set_snapshot(block, snapshot(block, true));
        }
        let submitter = Arc::new(MockSubmitter::new());
        let config = SchedulerConfig {
            skip_stale_decisions: false,
            ..Default::default()
        };
        let mut scheduler = scheduler(&chain, &submitter, config);

        scheduler.tick().await;
        scheduler.tick().await;
        let third = scheduler.tick().await;
        assert!(matches!(third, CycleOutcome::Waited { block: 7 }));

        let heights: Vec<u64> = submitter.submissions().iter().map(|s| s.1).collect();
        assert_eq!(heights, vec![7, 8]);
        assert_eq!(chain.scanned_blocks(), vec![7, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_timeout_resyncs_submitter() {
        let chain = Arc::new(MockChain::new(&[50]));
        chain.set_snapshot(50, snapshot(50, true));
        let submitter = Arc::new(MockSubmitter::new().with_submit_delay(Duration::from_secs(30)));
        let config = SchedulerConfig {
            submit_timeout: Duration::from_secs(2),
            skip_stale_decisions: false,
            ..Default::default()
        };
        let mut scheduler = scheduler(&chain, &submitter, config);

        let outcome = scheduler.tick().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed {
                block: Some(50),
                error: PipelineError::Submission(SubmissionError::Timeout(_))
            }
        ));
        assert_eq!(submitter.resyncs(), 1);
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_height_is_not_retried() {
        let chain = Arc::new(MockChain::new(&[3, 3, 3]));
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());

        assert!(matches!(scheduler.tick().await, CycleOutcome::Failed { block: Some(3), .. }));
        assert!(matches!(scheduler.tick().await, CycleOutcome::Waited { block: 3 }));
        assert!(matches!(scheduler.tick().await, CycleOutcome::Waited { block: 3 }));
        assert_eq!(chain.scanned_blocks(), vec![3]);
        assert_eq!(scheduler.last_block(), Some(3));
    }

    #[tokio::test]
    async fn test_stale_decision_is_dropped() {
        // Head reads: cycle at 50, then 51 when re-checked before submission
        let chain = Arc::new(MockChain::new(&[50, 51]));
        chain.set_snapshot(50, snapshot(50, true));
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());

        let outcome = scheduler.tick().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Processed {
                block: 50,
                outcome: PipelineOutcome::Stale {
                    scanned: 50,
                    head: 51,
                    ..
                }
            }
        ));
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_stale_check_can_be_disabled() {
        let chain = Arc::new(MockChain::new(&[50, 51]));
        chain.set_snapshot(50, snapshot(50, true));
        let submitter = Arc::new(MockSubmitter::new());
        let config = SchedulerConfig {
            skip_stale_decisions: false,
            ..Default::default()
        };
        let mut scheduler = scheduler(&chain, &submitter, config);

        scheduler.tick().await;
        assert_eq!(submitter.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_assets_refresh_on_first_cycle_and_cadence() {
        let chain = Arc::new(MockChain::new(&[1]));
        chain.set_snapshot(1, snapshot(1, false));
        let submitter = Arc::new(MockSubmitter::new());
        let config = SchedulerConfig {
            asset_refresh_cycles: 3,
            ..Default::default()
        };
        let mut scheduler = scheduler(&chain, &submitter, config);

        scheduler.tick().await;
        assert_eq!(chain.asset_calls(), 1);
        assert_eq!(scheduler.registry().len(), 1);

        scheduler.tick().await;
        scheduler.tick().await;
        assert_eq!(chain.asset_calls(), 1);

        scheduler.tick().await;
        assert_eq!(chain.asset_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_assets_and_retries_next_cycle() {
        let chain = Arc::new(MockChain::new(&[1]));
        chain.set_snapshot(1, snapshot(1, false));
        let submitter = Arc::new(MockSubmitter::new());
        let config = SchedulerConfig {
            asset_refresh_cycles: 1,
            ..Default::default()
        };
        let mut scheduler = scheduler(&chain, &submitter, config);

        scheduler.tick().await;
        assert_eq!(scheduler.registry().len(), 1);

        chain.set_asset_infos(None);
        let outcome = scheduler.tick().await;
        assert!(matches!(outcome, CycleOutcome::Waited { block: 1 }));
        assert_eq!(scheduler.registry().len(), 1);
        assert_eq!(chain.asset_calls(), 2);

        scheduler.tick().await;
        assert_eq!(chain.asset_calls(), 3);
    }

    #[tokio::test]
    async fn test_unpopulated_registry_retries_every_cycle() {
        let chain = Arc::new(MockChain::new(&[1]));
        chain.set_snapshot(1, snapshot(1, true));
        let submitter = Arc::new(MockSubmitter::new());
        let mut scheduler = scheduler(&chain, &submitter, SchedulerConfig::default());
        chain.set_asset_infos(None);

        // Without assets the account is still absorbed, with nothing to buy back
        match scheduler.tick().await {
            CycleOutcome::Processed {
                outcome: PipelineOutcome::Submitted { action: Action::Liquidate { seized_assets, .. }, .. },
                ..
            } => assert!(seized_assets.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!scheduler.registry().is_populated());

        scheduler.tick().await;
        assert_eq!(chain.asset_calls(), 2);
    }
}
