//! Core types shared by the swap-burn cycle components.

use crate::burner::error::BurnError;
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lamports per whole unit of the native currency.
pub const LAMPORTS_PER_NATIVE: f64 = 1_000_000_000.0;

/// How much of the post-swap token balance a cycle destroys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurnPolicy {
    /// Burn everything the token account holds.
    FullBalance,
    /// Burn `floor(balance / 2)` and keep the rest.
    HalfBalance,
}

impl BurnPolicy {
    pub fn burn_amount(&self, balance: u64) -> u64 {
        match self {
            BurnPolicy::FullBalance => balance,
            BurnPolicy::HalfBalance => balance / 2,
        }
    }
}

impl FromStr for BurnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "full-balance" | "all" => Ok(BurnPolicy::FullBalance),
            "half" | "half-balance" => Ok(BurnPolicy::HalfBalance),
            other => Err(format!("unknown burn policy '{}', expected 'full' or 'half'", other)),
        }
    }
}

/// Which aggregator endpoint supplies the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapFlow {
    /// `POST /swap`: a ready-to-sign serialized transaction
    Transaction,
    /// `POST /swap-instructions`: raw instructions assembled locally
    Instructions,
}

impl FromStr for SwapFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transaction" | "swap" => Ok(SwapFlow::Transaction),
            "instructions" | "swap-instructions" => Ok(SwapFlow::Instructions),
            other => Err(format!(
                "unknown swap flow '{}', expected 'transaction' or 'instructions'",
                other
            )),
        }
    }
}

/// Immutable per-run cycle parameters.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Mint of the token that is bought and burned
    pub target_mint: Pubkey,
    /// Native reserve in whole units; multiplied by 1e9 into a lamport floor
    pub reserve_ratio: f64,
    /// Claim the creator-fee reward before swapping
    pub claim_rewards: bool,
    pub burn_policy: BurnPolicy,
    pub swap_flow: SwapFlow,
    /// Fixed slippage tolerance in basis points
    pub slippage_bps: u16,
    pub commitment: CommitmentConfig,
    /// Upper bound on waiting for one confirmation
    pub confirm_timeout: Duration,
    /// Interval between signature status polls
    pub confirm_poll_interval: Duration,
}

impl CycleConfig {
    pub fn new(target_mint: Pubkey) -> Self {
        Self {
            target_mint,
            reserve_ratio: 0.01,
            claim_rewards: false,
            burn_policy: BurnPolicy::FullBalance,
            swap_flow: SwapFlow::Transaction,
            slippage_bps: 50,
            commitment: CommitmentConfig::confirmed(),
            confirm_timeout: Duration::from_secs(60),
            confirm_poll_interval: Duration::from_millis(1000),
        }
    }

    /// Absolute lamport floor that is never spent.
    pub fn reserve_lamports(&self) -> u64 {
        (self.reserve_ratio * LAMPORTS_PER_NATIVE).round() as u64
    }

    /// Lamports available for the swap, or `None` when the balance does not
    /// exceed the reserve.
    pub fn spendable(&self, balance: u64) -> Option<u64> {
        balance
            .checked_sub(self.reserve_lamports())
            .filter(|spend| *spend > 0)
    }
}

/// Something that can be normalized into one signable transaction.
#[derive(Debug, Clone)]
pub enum TransactionPayload {
    /// Fully built transaction; its blockhash is refreshed before signing
    Prebuilt(VersionedTransaction),
    /// Instructions assembled in order, fee payer attached
    Instructions(Vec<Instruction>),
}

impl TransactionPayload {
    pub fn describe(&self) -> String {
        match self {
            TransactionPayload::Prebuilt(_) => "prebuilt transaction".to_string(),
            TransactionPayload::Instructions(ixs) => format!("{} instructions", ixs.len()),
        }
    }
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub signature: Option<Signature>,
    pub confirmed: bool,
    pub error: Option<BurnError>,
}

impl TransactionOutcome {
    pub fn confirmed(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            confirmed: true,
            error: None,
        }
    }

    pub fn failed(signature: Option<Signature>, error: BurnError) -> Self {
        Self {
            signature,
            confirmed: false,
            error: Some(error),
        }
    }

    /// The failure as an error value, if the transaction did not confirm.
    pub fn into_result(self) -> Result<Signature, BurnError> {
        match (self.confirmed, self.signature, self.error) {
            (true, Some(signature), _) => Ok(signature),
            (_, _, Some(error)) => Err(error),
            (_, _, None) => Err(BurnError::ConfirmationFailed(
                "transaction not confirmed".to_string(),
            )),
        }
    }
}

/// Steps of the cycle state machine, used to locate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    ClaimOptional,
    CheckBalance,
    Swap,
    CheckTokenBalance,
    Burn,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::ClaimOptional => "claim",
            CycleStage::CheckBalance => "check-balance",
            CycleStage::Swap => "swap",
            CycleStage::CheckTokenBalance => "check-token-balance",
            CycleStage::Burn => "burn",
        };
        f.write_str(name)
    }
}

/// Outcome of one cycle invocation. Reported once and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleResult {
    Success {
        swap_signature: Signature,
        burn_signature: Signature,
        spent_lamports: u64,
        burned: u64,
        remaining: u64,
    },
    AbortedInsufficientBalance {
        balance: u64,
        reserve: u64,
    },
    AbortedNoRoute {
        amount: u64,
    },
    AbortedZeroTokenBalance,
    Failed {
        stage: CycleStage,
        message: String,
    },
}

impl CycleResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleResult::Success { .. })
    }

    pub fn failed(stage: CycleStage, error: &BurnError) -> Self {
        CycleResult::Failed {
            stage,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for CycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleResult::Success {
                burn_signature,
                spent_lamports,
                burned,
                remaining,
                ..
            } => write!(
                f,
                "Burned {} tokens bought with {:.4} SOL ({} left in account). Burn tx: {}",
                burned,
                *spent_lamports as f64 / LAMPORTS_PER_NATIVE,
                remaining,
                burn_signature
            ),
            CycleResult::AbortedInsufficientBalance { balance, reserve } => write!(
                f,
                "Cycle skipped: balance {} lamports does not exceed reserve {}",
                balance, reserve
            ),
            CycleResult::AbortedNoRoute { amount } => {
                write!(f, "Cycle aborted: no swap route for {} lamports", amount)
            }
            CycleResult::AbortedZeroTokenBalance => {
                write!(f, "Cycle aborted: token balance is zero, nothing to burn")
            }
            CycleResult::Failed { stage, message } => {
                write!(f, "Cycle failed at {}: {}", stage, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_balance_truncates() {
        let policy = BurnPolicy::HalfBalance;
        assert_eq!(policy.burn_amount(7), 3);
        assert_eq!(7 - policy.burn_amount(7), 4);
        assert_eq!(policy.burn_amount(1), 0);
        assert_eq!(BurnPolicy::FullBalance.burn_amount(7), 7);
    }

    #[test]
    fn test_reserve_is_absolute_floor() {
        let config = CycleConfig::new(Pubkey::new_unique());
        assert_eq!(config.reserve_lamports(), 10_000_000);
        assert_eq!(config.spendable(10_000_000_000), Some(9_990_000_000));
        assert_eq!(config.spendable(10_000_000), None);
        assert_eq!(config.spendable(5), None);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("FULL".parse::<BurnPolicy>().unwrap(), BurnPolicy::FullBalance);
        assert_eq!("half".parse::<BurnPolicy>().unwrap(), BurnPolicy::HalfBalance);
        assert!("quarter".parse::<BurnPolicy>().is_err());
        assert_eq!(
            "swap-instructions".parse::<SwapFlow>().unwrap(),
            SwapFlow::Instructions
        );
    }

    #[test]
    fn test_outcome_into_result() {
        let sig = Signature::default();
        assert_eq!(TransactionOutcome::confirmed(sig).into_result(), Ok(sig));

        let failed = TransactionOutcome::failed(Some(sig), BurnError::ConfirmationTimeout(60));
        assert_eq!(failed.into_result(), Err(BurnError::ConfirmationTimeout(60)));
    }

    #[test]
    fn test_failed_result_message() {
        let result = CycleResult::failed(
            CycleStage::Burn,
            &BurnError::SubmissionFailed("blockhash expired".into()),
        );
        assert_eq!(
            result.to_string(),
            "Cycle failed at burn: submission failed: blockhash expired"
        );
    }
}
