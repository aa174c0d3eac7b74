//! swapburn - scheduled buy-and-burn service for a Solana SPL token
//!
//! Each cycle optionally claims pump.fun creator fees, swaps spendable SOL
//! into the target token through a swap aggregator, and burns the tokens
//! received, reporting progress through pluggable notifiers.

pub mod types;
pub mod burner;
pub mod config;
pub mod notify;
pub mod schedule;

// Re-export main types for convenience
pub use burner::{CycleConfig, CycleResult, CycleRunner};
pub use config::BurnerConfig;
pub use schedule::{Cadence, Scheduler};
pub use types::{SecretKey, Wallet};
