//! Cycle cadence and the resident scheduling loop.

use crate::burner::{CycleResult, CycleRunner};
use crate::notify::Notifier;
#[cfg(unix)]
use anyhow::Context;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::info;
#[cfg(not(unix))]
use tracing::warn;

/// How often a cycle fires, as a whole-minute period aligned to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    minutes: u32,
}

impl Cadence {
    pub fn every_minutes(minutes: u32) -> Result<Self, String> {
        if minutes == 0 {
            return Err("cadence must be at least one minute".to_string());
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// First aligned fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let period = i64::from(self.minutes) * 60;
        let ts = now.timestamp();
        let next = (ts.div_euclid(period) + 1) * period;
        DateTime::from_timestamp(next, 0).unwrap_or(now + ChronoDuration::seconds(period))
    }
}

fn parse_step(field: &str) -> Option<u32> {
    match field {
        "*" => Some(1),
        _ => field.strip_prefix("*/")?.parse().ok(),
    }
}

impl FromStr for Cadence {
    type Err = String;

    /// Accepts `N`, `Nm`, `Nh`, `*/N * * * *`, `* * * * *`, `0 */N * * *`
    /// and `0 * * * *`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let fields: Vec<&str> = raw.split_whitespace().collect();

        let minutes = match fields.as_slice() {
            [single] => {
                let single = *single;
                if let Some(hours) = single.strip_suffix('h') {
                    hours.parse::<u32>().ok().and_then(|h| h.checked_mul(60))
                } else {
                    single.strip_suffix('m').unwrap_or(single).parse::<u32>().ok()
                }
            }
            [minute, hour, "*", "*", "*"] => match (*minute, *hour) {
                ("0", "*") => Some(60),
                (m, "*") => parse_step(m),
                ("0", h) => parse_step(h).and_then(|h| h.checked_mul(60)),
                _ => None,
            },
            _ => None,
        };

        minutes
            .ok_or_else(|| format!("unsupported cadence '{}'", raw))
            .and_then(Cadence::every_minutes)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {} min", self.minutes)
    }
}

/// Triggers cycles on the cadence, one at a time, until `ctrl_c`.
pub struct Scheduler {
    cadence: Cadence,
    runner: Arc<CycleRunner>,
    announcer: Option<Arc<dyn Notifier>>,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(
        cadence: Cadence,
        runner: Arc<CycleRunner>,
        announcer: Option<Arc<dyn Notifier>>,
        run_on_start: bool,
    ) -> Self {
        Self {
            cadence,
            runner,
            announcer,
            run_on_start,
        }
    }

    /// Run one cycle and pass a success on to the announcer.
    pub async fn trigger(&self) -> CycleResult {
        let result = self.runner.run_cycle().await;
        if let (true, Some(announcer)) = (result.is_success(), &self.announcer) {
            announcer.notify(&result.to_string()).await;
        }
        result
    }

    /// Run until SIGINT or SIGTERM. A signal arriving mid-cycle stops the
    /// loop once that cycle finishes.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut signals = ShutdownSignal::listen()?;
        self.run_until(signals.recv()).await;
        Ok(())
    }

    /// Run until `shutdown` resolves. It is checked before every wait, so a
    /// request made during a cycle is seen as soon as that cycle returns.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Scheduler started ({})", self.cadence);
        if self.run_on_start {
            self.trigger().await;
        }

        loop {
            let now = Utc::now();
            let next = self.cadence.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next cycle at {}", next.format("%Y-%m-%d %H:%M:%S UTC"));

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.trigger().await;
                }
            }
        }
    }
}

/// Process signal listeners, registered up front so nothing delivered while
/// a cycle runs is lost.
struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    #[cfg(unix)]
    fn listen() -> anyhow::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?,
            terminate: signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?,
        })
    }

    #[cfg(not(unix))]
    fn listen() -> anyhow::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("Received SIGINT"),
            _ = self.terminate.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
    }
}
