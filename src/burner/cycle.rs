//! Swap-burn cycle orchestrator.
//!
//! `Start -> [ClaimOptional] -> CheckBalance -> Swap -> CheckTokenBalance ->
//! Burn -> Done`, with every step able to abort. Each invocation is
//! independent: nothing is carried between cycles except what is read back
//! from the chain, and no terminal error escapes [`CycleRunner::run_cycle`].

use crate::burner::aggregator::SwapAggregator;
use crate::burner::burn::{build_burn, token_account_for};
use crate::burner::claim::claim_reward;
use crate::burner::error::BurnError;
use crate::burner::retry::RetryPolicy;
use crate::burner::router::SwapRouter;
use crate::burner::rpc::{BalanceReader, ChainRpc};
use crate::burner::submitter::TransactionSubmitter;
use crate::burner::types::{CycleConfig, CycleResult, CycleStage, TransactionPayload};
use crate::notify::Notifier;
use crate::types::Wallet;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Mint of wrapped native SOL, the swap input.
pub fn native_mint() -> Pubkey {
    spl_token::native_mint::id()
}

pub struct CycleRunner {
    config: CycleConfig,
    wallet: Wallet,
    balances: BalanceReader,
    router: SwapRouter,
    submitter: TransactionSubmitter,
    notifier: Arc<dyn Notifier>,
}

impl CycleRunner {
    pub fn new(
        config: CycleConfig,
        wallet: Wallet,
        rpc: Arc<dyn ChainRpc>,
        aggregator: Arc<dyn SwapAggregator>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
    ) -> Self {
        let balances = BalanceReader::new(rpc.clone(), retry);
        let router = SwapRouter::new(aggregator, retry, config.slippage_bps, config.swap_flow);
        let submitter = TransactionSubmitter::new(
            rpc,
            retry,
            config.commitment,
            config.confirm_timeout,
            config.confirm_poll_interval,
        );

        Self {
            config,
            wallet,
            balances,
            router,
            submitter,
            notifier,
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run one cycle to completion and report its result exactly once.
    #[instrument(skip(self), fields(wallet = %self.wallet.pubkey(), mint = %self.config.target_mint))]
    pub async fn run_cycle(&self) -> CycleResult {
        self.notifier.notify("Starting swap-burn cycle").await;

        let result = self.execute().await;
        match &result {
            CycleResult::Success { .. } => info!("{}", result),
            CycleResult::Failed { .. } => error!("{}", result),
            _ => warn!("{}", result),
        }
        self.notifier.notify(&result.to_string()).await;
        result
    }

    async fn execute(&self) -> CycleResult {
        let owner = self.wallet.pubkey();
        let mint = self.config.target_mint;

        // ClaimOptional: never aborts the cycle.
        if self.config.claim_rewards {
            let outcome = claim_reward(&self.submitter, &self.wallet).await;
            match outcome.error {
                None => self.notifier.notify("Creator fee claimed").await,
                Some(err) => {
                    let err = BurnError::ClaimFailed(err.to_string());
                    self.notifier
                        .notify(&format!("{}; continuing with swap", err))
                        .await;
                }
            }
        }

        // CheckBalance
        let balance = match self.balances.read_native_balance(&owner).await {
            Ok(balance) => balance,
            Err(err) => return CycleResult::failed(CycleStage::CheckBalance, &err),
        };
        let reserve = self.config.reserve_lamports();
        let spend = match self.config.spendable(balance) {
            Some(spend) => spend,
            None => return CycleResult::AbortedInsufficientBalance { balance, reserve },
        };
        info!("Spending {} of {} lamports (reserve {})", spend, balance, reserve);

        // Swap
        let prepared = match self
            .router
            .get_swap_transaction(&native_mint(), &mint, spend, &owner)
            .await
        {
            Ok(prepared) => prepared,
            Err(BurnError::NoRouteFound { amount, .. }) => {
                return CycleResult::AbortedNoRoute { amount }
            }
            Err(err) => return CycleResult::failed(CycleStage::Swap, &err),
        };
        self.notifier
            .notify(&format!(
                "Route found, submitting swap ({})",
                prepared.payload.describe()
            ))
            .await;

        let swap_outcome = self
            .submitter
            .submit("swap", prepared.payload, &self.wallet)
            .await;
        let swap_signature = match swap_outcome.into_result() {
            Ok(signature) => signature,
            Err(err) => return CycleResult::failed(CycleStage::Swap, &err),
        };
        self.notifier
            .notify(&format!("Swap confirmed: {}", swap_signature))
            .await;

        // CheckTokenBalance: always a fresh read.
        let token_account = token_account_for(&owner, &mint);
        let token_balance = match self.balances.read_token_balance(&token_account).await {
            Ok(balance) => balance,
            Err(err) => return CycleResult::failed(CycleStage::CheckTokenBalance, &err),
        };
        let burn_amount = self.config.burn_policy.burn_amount(token_balance);
        if burn_amount == 0 {
            return CycleResult::AbortedZeroTokenBalance;
        }

        // Burn
        let burn_ix = match build_burn(&token_account, &mint, &owner, burn_amount) {
            Ok(ix) => ix,
            Err(err) => return CycleResult::failed(CycleStage::Burn, &err),
        };
        self.notifier
            .notify(&format!("Submitting burn of {} tokens", burn_amount))
            .await;
        let burn_outcome = self
            .submitter
            .submit("burn", TransactionPayload::Instructions(vec![burn_ix]), &self.wallet)
            .await;
        match burn_outcome.into_result() {
            Ok(burn_signature) => CycleResult::Success {
                swap_signature,
                burn_signature,
                spent_lamports: spend,
                burned: burn_amount,
                remaining: token_balance - burn_amount,
            },
            Err(err) => CycleResult::failed(CycleStage::Burn, &err),
        }
    }
}
