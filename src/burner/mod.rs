//! Burner module - the swap-burn cycle and its network collaborators.
//!
//! Leaf-first: retry executor, balance reader, swap router, transaction
//! submitter, burn builder, reward claim, and the cycle orchestrator that
//! sequences them.

pub mod types;
pub mod error;
pub mod retry;
pub mod rpc;
pub mod aggregator;
pub mod router;
pub mod submitter;
pub mod burn;
pub mod claim;
pub mod cycle;

// Re-export main public types and the orchestrator
pub use cycle::{native_mint, CycleRunner};
pub use error::BurnError;
pub use types::{
    BurnPolicy, CycleConfig, CycleResult, CycleStage, SwapFlow, TransactionOutcome,
    TransactionPayload,
};

// Re-export components for direct use
pub use aggregator::{JupiterClient, Quote, QuoteRequest, Route, RouteShape, SwapAggregator};
pub use burn::{build_burn, token_account_for};
pub use claim::{build_claim, claim_reward};
pub use retry::RetryPolicy;
pub use router::{PreparedSwap, SwapRouter};
pub use rpc::{BalanceReader, ChainRpc, SignatureState};
pub use submitter::{prepare_transaction, TransactionSubmitter};

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// Cycle configuration builder with sensible defaults.
pub struct CycleConfigBuilder {
    config: CycleConfig,
}

impl CycleConfigBuilder {
    /// Start from defaults for the given target token.
    pub fn new(target_mint: Pubkey) -> Self {
        Self {
            config: CycleConfig::new(target_mint),
        }
    }

    pub fn with_reserve_ratio(mut self, ratio: f64) -> Self {
        self.config.reserve_ratio = ratio;
        self
    }

    pub fn with_claim_rewards(mut self, enabled: bool) -> Self {
        self.config.claim_rewards = enabled;
        self
    }

    pub fn with_burn_policy(mut self, policy: BurnPolicy) -> Self {
        self.config.burn_policy = policy;
        self
    }

    pub fn with_swap_flow(mut self, flow: SwapFlow) -> Self {
        self.config.swap_flow = flow;
        self
    }

    pub fn with_slippage_bps(mut self, bps: u16) -> Self {
        self.config.slippage_bps = bps;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.config.commitment = commitment;
        self
    }

    /// Set the bounded confirmation wait and the status poll interval.
    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.config.confirm_timeout = timeout;
        self.config.confirm_poll_interval = poll_interval;
        self
    }

    pub fn build(self) -> CycleConfig {
        self.config
    }
}
