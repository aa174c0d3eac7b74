//! Main entry point for the swap-burn service

use anyhow::{Context, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use std::sync::Arc;
use std::time::Duration;
use swapburn::burner::{ChainRpc, CycleRunner, JupiterClient};
use swapburn::notify::{FanoutNotifier, LogNotifier, Notifier, WebSocketNotifier, WebhookNotifier};
use swapburn::{BurnerConfig, Scheduler, Wallet};
use tracing::info;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);
const DASHBOARD_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let config = BurnerConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let wallet = Wallet::from_secret(&config.secret_key).context("Invalid PRIVATE_KEY")?;
    info!(
        "Starting swap-burn service: wallet {}, target mint {}, {}",
        wallet.pubkey(),
        config.cycle.target_mint,
        config.cadence
    );

    let rpc: Arc<dyn ChainRpc> = Arc::new(RpcClient::new_with_timeout_and_commitment(
        config.rpc_url.clone(),
        RPC_TIMEOUT,
        config.cycle.commitment,
    ));
    let aggregator = Arc::new(
        JupiterClient::new(&config.aggregator_url, config.aggregator_requests_per_second)
            .context("Failed to create aggregator client")?,
    );

    let mut notifier = FanoutNotifier::new(vec![Arc::new(LogNotifier)]);
    if let Some(url) = &config.notify.websocket_url {
        info!("Streaming cycle progress to {}", url);
        notifier.push(Arc::new(WebSocketNotifier::spawn(url.clone(), DASHBOARD_QUEUE_CAPACITY)));
    }
    let announcer = config
        .notify
        .announce_webhook_url
        .as_ref()
        .map(|url| Arc::new(WebhookNotifier::new(url.clone())) as Arc<dyn Notifier>);

    let runner = Arc::new(CycleRunner::new(
        config.cycle.clone(),
        wallet,
        rpc,
        aggregator,
        Arc::new(notifier),
        config.retry,
    ));

    Scheduler::new(config.cadence, runner, announcer, config.run_on_start)
        .run()
        .await?;

    info!("Swap-burn service stopped");
    Ok(())
}
