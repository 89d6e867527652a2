//! Comet Liquidation Bot
//!
//! Polls a Compound III market block by block, absorbs underwater accounts
//! and buys discounted collateral from protocol reserves.
//! Features:
//! - One pinned-block snapshot read per new block
//! - Liquidation before arbitrage, deterministic selection
//! - Direct or private relay (Flashbots) submission

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_chain::{LiquidatorContract, ProviderManager, RelayClient, TransactionSender};
use liquidator_core::{
    AssetRegistry, ChainSubmitter, Evaluator, Scheduler, SchedulerConfig, StartupPlan, StateReader,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    // Everything fatal is decided here, before any network call
    let plan = StartupPlan::from_env().context("invalid startup configuration")?;
    plan.bot.log_config();
    plan.log_plan();

    let mut scheduler = initialize_components(&plan).await?;

    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Shutdown requested, exiting");
        }
    }

    Ok(())
}

/// Initialize tracing. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(|| fmt::layer()))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,liquidator_core=debug,liquidator_chain=debug")),
        )
        .init();
}

async fn initialize_components(plan: &StartupPlan) -> Result<Scheduler> {
    info!("Initializing components...");
    let timing = &plan.bot.scheduler;

    // Chain state reader
    let provider = ProviderManager::new(&plan.rpc_url, plan.market_addresses(), plan.market.start_block)?
        .with_max_log_range(plan.max_log_range);
    let reader = StateReader::new(Arc::new(provider), timing.call_timeout());

    // Funds-holding signer
    let sender = TransactionSender::new(
        &plan.env.private_key,
        &plan.rpc_url,
        plan.chain_id,
        plan.gas,
        plan.bot.submission.gas_limit,
    )
    .await
    .context("failed to initialize transaction sender")?;

    // Reputation identity is generated per process start
    let relay = plan
        .relay
        .map(RelayClient::with_ephemeral_identity)
        .transpose()?;

    let submitter = ChainSubmitter::new(
        sender,
        relay,
        LiquidatorContract::new(plan.liquidator(), plan.market.comet),
        plan.env.network.clone(),
        plan.env.deployment.clone(),
        plan.bot.submission.inclusion_poll(),
    );

    info!("All components initialized");

    Ok(Scheduler::new(
        reader,
        AssetRegistry::new(),
        Evaluator::new(&plan.bot.arbitrage),
        Arc::new(submitter),
        SchedulerConfig::from(timing),
    ))
}
