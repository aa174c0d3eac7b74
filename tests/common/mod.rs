//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swapburn::burner::{
    BurnError, ChainRpc, CycleConfig, CycleConfigBuilder, CycleRunner, Quote, QuoteRequest,
    RetryPolicy, Route, RouteShape, SignatureState, SwapAggregator, SwapFlow,
    TransactionPayload,
};
use swapburn::notify::Notifier;
use swapburn::Wallet;

/// Chain double: fixed native balance, scripted token balances, recorded sends.
#[derive(Default)]
pub struct MockRpc {
    pub native_balance: Mutex<u64>,
    /// Popped per read; the last value sticks once the script runs out.
    pub token_balances: Mutex<VecDeque<Option<u64>>>,
    /// Popped per send; an empty script accepts the transaction.
    pub send_results: Mutex<VecDeque<Result<(), BurnError>>>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub never_confirm: AtomicBool,
    pub balance_reads: AtomicUsize,
    pub token_reads: AtomicUsize,
}

impl MockRpc {
    pub fn with_balances(native: u64, tokens: Vec<Option<u64>>) -> Self {
        Self {
            native_balance: Mutex::new(native),
            token_balances: Mutex::new(tokens.into()),
            ..Default::default()
        }
    }

    pub fn fail_send(&self, index_from_now: usize, err: BurnError) {
        let mut script = self.send_results.lock().unwrap();
        while script.len() < index_from_now {
            script.push_back(Ok(()));
        }
        script.push_back(Err(err));
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_balance(&self, _address: &Pubkey) -> Result<u64, BurnError> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.native_balance.lock().unwrap())
    }

    async fn get_token_balance(&self, _token_account: &Pubkey) -> Result<Option<u64>, BurnError> {
        self.token_reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.token_balances.lock().unwrap();
        if script.len() > 1 {
            Ok(script.pop_front().flatten())
        } else {
            Ok(script.front().copied().flatten())
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, BurnError> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, BurnError> {
        let scripted = self.send_results.lock().unwrap().pop_front();
        if let Some(Err(err)) = scripted {
            return Err(err);
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn signature_state(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SignatureState, BurnError> {
        if self.never_confirm.load(Ordering::SeqCst) {
            Ok(SignatureState::Pending)
        } else {
            Ok(SignatureState::Confirmed)
        }
    }
}

/// Aggregator double returning a fixed route list and an instruction payload.
pub struct MockAggregator {
    pub routes: Vec<Route>,
    pub quote_requests: Mutex<Vec<QuoteRequest>>,
    pub payload_requests: AtomicUsize,
}

impl MockAggregator {
    pub fn with_route(out_amount: u64) -> Self {
        Self::with_routes(vec![Route {
            shape: RouteShape::QuoteResponse,
            raw: json!({
                "outAmount": out_amount.to_string(),
                "routePlan": [{ "percent": 100 }],
            }),
        }])
    }

    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self {
            routes,
            quote_requests: Mutex::new(Vec::new()),
            payload_requests: AtomicUsize::new(0),
        }
    }

    pub fn quote_count(&self) -> usize {
        self.quote_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SwapAggregator for MockAggregator {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BurnError> {
        self.quote_requests.lock().unwrap().push(request.clone());
        Ok(Quote {
            routes: self.routes.clone(),
        })
    }

    async fn swap_payload(
        &self,
        _route: &Route,
        user: &Pubkey,
        _flow: SwapFlow,
    ) -> Result<TransactionPayload, BurnError> {
        self.payload_requests.fetch_add(1, Ordering::SeqCst);
        let swap_ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1, 2, 3],
            vec![AccountMeta::new(*user, true)],
        );
        Ok(TransactionPayload::Instructions(vec![swap_ix]))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

pub fn test_config(mint: Pubkey) -> CycleConfig {
    CycleConfigBuilder::new(mint)
        .with_swap_flow(SwapFlow::Instructions)
        .with_confirmation(Duration::from_secs(5), Duration::from_millis(10))
        .build()
}

pub fn runner(
    config: CycleConfig,
    rpc: Arc<MockRpc>,
    aggregator: Arc<MockAggregator>,
    notifier: Arc<RecordingNotifier>,
) -> CycleRunner {
    CycleRunner::new(
        config,
        Wallet::new(Keypair::new()),
        rpc,
        aggregator,
        notifier,
        RetryPolicy::new(3, Duration::from_millis(10)),
    )
}
