//! Notification sinks.
//!
//! The cycle reports human-readable lines through [`Notifier`]. Delivery is
//! best effort: sinks swallow their own failures so a dead dashboard or
//! webhook never affects a cycle.

use async_trait::async_trait;
use futures::SinkExt;
use rand::Rng;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one line. Fire-and-forget.
    async fn notify(&self, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        info!(target: "swapburn::notify", "{}", message);
    }
}

/// Forwards every notification to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Notifier>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify(message).await;
        }
    }
}

/// Posts `{"text": message}` to a webhook, e.g. a social-media relay.
pub struct WebhookNotifier {
    http_client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let result = self
            .http_client
            .post(&self.url)
            .timeout(Duration::from_secs(10))
            .json(&json!({ "text": message }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => debug!("Webhook delivered"),
            Ok(response) => warn!("Webhook rejected notification: {}", response.status()),
            Err(e) => warn!("Webhook delivery failed: {}", e),
        }
    }
}

/// Exponential reconnect delay with jitter, reset after a good connection.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Un-jittered delay for the current attempt.
    pub fn current_delay(&self) -> Duration {
        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay to wait before the next connect, with up to 20% jitter added.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay();
        self.attempt = self.attempt.saturating_add(1);
        let jitter_ms = (delay.as_millis() as u64) / 5;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        delay + Duration::from_millis(jitter)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Connection state of the websocket forwarder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Streams notifications to a dashboard websocket.
///
/// Lines go into a bounded queue drained by a background task which owns the
/// connection and reconnects with back-off when it drops. A full queue drops
/// the line instead of blocking the caller.
pub struct WebSocketNotifier {
    sender: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl WebSocketNotifier {
    pub fn spawn(url: impl Into<String>, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let url = url.into();
        let task = tokio::spawn(async move {
            let backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
            run_link(url, receiver, backoff).await;
        });
        Self { sender, task }
    }
}

impl Drop for WebSocketNotifier {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl Notifier for WebSocketNotifier {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.sender.try_send(message.to_string()) {
            debug!("Dashboard queue unavailable, dropping line: {}", e);
        }
    }
}

type DashboardStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn run_link(url: String, mut receiver: mpsc::Receiver<String>, mut backoff: ReconnectBackoff) {
    let mut state = LinkState::Connecting;
    let mut connection: Option<DashboardStream> = None;
    // Dequeued but not delivered before the link dropped.
    let mut pending: Option<String> = None;

    loop {
        state = match state {
            LinkState::Disconnected => {
                connection = None;
                let delay = backoff.next_delay();
                debug!("Reconnecting to dashboard in {:?}", delay);
                sleep(delay).await;
                LinkState::Connecting
            }
            LinkState::Connecting => match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    info!("Connected to dashboard log stream");
                    backoff.reset();
                    connection = Some(stream);
                    LinkState::Connected
                }
                Err(e) => {
                    warn!("Dashboard connection failed: {}", e);
                    LinkState::Disconnected
                }
            },
            LinkState::Connected => match connection.as_mut() {
                None => LinkState::Disconnected,
                Some(stream) => {
                    let line = match pending.take() {
                        Some(line) => line,
                        None => match receiver.recv().await {
                            Some(line) => line,
                            None => {
                                let _ = stream.close(None).await;
                                return;
                            }
                        },
                    };
                    match stream.send(Message::Text(line.clone())).await {
                        Ok(()) => LinkState::Connected,
                        Err(e) => {
                            warn!("Dashboard connection lost: {}", e);
                            pending = Some(line);
                            LinkState::Disconnected
                        }
                    }
                }
            },
        };
    }
}
