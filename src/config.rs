//! Environment-sourced configuration, loaded and validated once at start.

use crate::burner::{BurnPolicy, CycleConfig, CycleConfigBuilder, RetryPolicy, SwapFlow};
use crate::schedule::Cadence;
use crate::types::SecretKey;
use anyhow::{anyhow, bail, Context, Result};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Where outbound notifications go besides the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyConfig {
    /// Dashboard websocket receiving every progress line
    pub websocket_url: Option<String>,
    /// Webhook receiving the public announcement of a successful burn
    pub announce_webhook_url: Option<String>,
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct BurnerConfig {
    pub rpc_url: String,
    pub secret_key: SecretKey,
    pub cadence: Cadence,
    pub cycle: CycleConfig,
    pub aggregator_url: String,
    pub aggregator_requests_per_second: u32,
    pub retry: RetryPolicy,
    pub notify: NotifyConfig,
    pub run_on_start: bool,
    pub log_level: Level,
}

pub const DEFAULT_CADENCE: &str = "*/10 * * * *";
pub const DEFAULT_AGGREGATOR_URL: &str = "https://quote-api.jup.ag/v6";

impl BurnerConfig {
    /// Load from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let rpc_url = env.required("RPC_URL")?;
        let secret_key = SecretKey::new(env.required("PRIVATE_KEY")?);
        let target_mint: Pubkey = env.parse_required("TOKEN_MINT")?;

        let cadence: Cadence = env
            .get("CRON_SCHEDULE")
            .unwrap_or_else(|| DEFAULT_CADENCE.to_string())
            .parse()
            .map_err(|e: String| anyhow!("CRON_SCHEDULE is invalid: {}", e))?;

        let reserve_ratio: f64 = env.parse_or("RESERVE_RATIO", 0.01)?;
        if !reserve_ratio.is_finite() || reserve_ratio < 0.0 {
            bail!("RESERVE_RATIO must be a non-negative number, got {}", reserve_ratio);
        }

        let commitment = match env.get("COMMITMENT") {
            None => CommitmentConfig::confirmed(),
            Some(raw) => CommitmentConfig::from_str(&raw)
                .map_err(|e| anyhow!("COMMITMENT '{}' is invalid: {}", raw, e))?,
        };

        let confirm_timeout = Duration::from_secs(env.parse_or("CONFIRM_TIMEOUT_SECS", 60u64)?);
        if confirm_timeout.is_zero() {
            bail!("CONFIRM_TIMEOUT_SECS must be greater than zero");
        }
        let poll_interval = Duration::from_millis(env.parse_or("CONFIRM_POLL_MS", 1000u64)?);

        let cycle = CycleConfigBuilder::new(target_mint)
            .with_reserve_ratio(reserve_ratio)
            .with_claim_rewards(env.parse_or("CLAIM_REWARDS", false)?)
            .with_burn_policy(env.parse_or("BURN_POLICY", BurnPolicy::FullBalance)?)
            .with_swap_flow(env.parse_or("SWAP_FLOW", SwapFlow::Transaction)?)
            .with_slippage_bps(env.parse_or("SLIPPAGE_BPS", 50u16)?)
            .with_commitment(commitment)
            .with_confirmation(confirm_timeout, poll_interval)
            .build();

        let retry = RetryPolicy::new(
            env.parse_or("MAX_RETRIES", 5usize)?,
            Duration::from_millis(env.parse_or("RETRY_BASE_DELAY_MS", 500u64)?),
        );

        Ok(Self {
            rpc_url,
            secret_key,
            cadence,
            cycle,
            aggregator_url: env
                .get("AGGREGATOR_URL")
                .unwrap_or_else(|| DEFAULT_AGGREGATOR_URL.to_string()),
            aggregator_requests_per_second: env.parse_or("AGGREGATOR_RPS", 5u32)?,
            retry,
            notify: NotifyConfig {
                websocket_url: env.get("NOTIFY_WS_URL"),
                announce_webhook_url: env.get("ANNOUNCE_WEBHOOK_URL"),
            },
            run_on_start: env.parse_or("RUN_ON_START", true)?,
            log_level: env.parse_or("LOG_LEVEL", Level::INFO)?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Value of `key`, with blank values treated as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("missing required environment variable {}", key))
    }

    fn parse_required<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.required(key)?;
        raw.parse::<T>()
            .map_err(|e| anyhow!("{} '{}' is invalid: {}", key, raw, e))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow!("{} '{}' is invalid: {}", key, raw, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Keypair;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("RPC_URL", "https://rpc.example.com".to_string()),
            ("PRIVATE_KEY", Keypair::new().to_base58_string()),
            ("TOKEN_MINT", Pubkey::new_unique().to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<BurnerConfig> {
        BurnerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.cadence.minutes(), 10);
        assert_eq!(config.cycle.reserve_ratio, 0.01);
        assert!(!config.cycle.claim_rewards);
        assert_eq!(config.cycle.burn_policy, BurnPolicy::FullBalance);
        assert_eq!(config.cycle.swap_flow, SwapFlow::Transaction);
        assert_eq!(config.cycle.commitment, CommitmentConfig::confirmed());
        assert_eq!(config.aggregator_url, DEFAULT_AGGREGATOR_URL);
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(500)));
        assert_eq!(config.notify, NotifyConfig::default());
        assert!(config.run_on_start);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("CRON_SCHEDULE", "*/30 * * * *".to_string());
        env.insert("RESERVE_RATIO", "0.5".to_string());
        env.insert("CLAIM_REWARDS", "true".to_string());
        env.insert("BURN_POLICY", "half".to_string());
        env.insert("SWAP_FLOW", "instructions".to_string());
        env.insert("COMMITMENT", "finalized".to_string());
        env.insert("NOTIFY_WS_URL", "ws://dashboard:8080".to_string());
        env.insert("LOG_LEVEL", "debug".to_string());

        let config = load(&env).unwrap();

        assert_eq!(config.cadence.minutes(), 30);
        assert_eq!(config.cycle.reserve_lamports(), 500_000_000);
        assert!(config.cycle.claim_rewards);
        assert_eq!(config.cycle.burn_policy, BurnPolicy::HalfBalance);
        assert_eq!(config.cycle.swap_flow, SwapFlow::Instructions);
        assert_eq!(config.cycle.commitment, CommitmentConfig::finalized());
        assert_eq!(config.notify.websocket_url.as_deref(), Some("ws://dashboard:8080"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_missing_required() {
        let mut env = base_env();
        env.remove("TOKEN_MINT");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("TOKEN_MINT"));
    }

    #[test]
    fn test_invalid_values() {
        let mut env = base_env();
        env.insert("RESERVE_RATIO", "-1".to_string());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("CLAIM_REWARDS", "maybe".to_string());
        assert!(load(&env).unwrap_err().to_string().contains("CLAIM_REWARDS"));

        let mut env = base_env();
        env.insert("CRON_SCHEDULE", "15 4 * * 1".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_secret_key_not_in_debug_output() {
        let env = base_env();
        let config = load(&env).unwrap();
        assert!(!format!("{:?}", config).contains(env["PRIVATE_KEY"].as_str()));
    }
}
