//! Blockchain RPC seam and the balance reader built on it.

use crate::burner::error::{is_account_missing, BurnError};
use crate::burner::retry::RetryPolicy;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionStatus;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Status of a submitted signature at the requested commitment.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureState {
    /// Not yet seen, or seen below the requested commitment
    Pending,
    Confirmed,
    /// Landed but the transaction itself errored
    Failed(String),
}

/// Network calls the cycle needs from a blockchain node.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, BurnError>;

    /// Raw token amount, or `None` when the account does not exist.
    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<Option<u64>, BurnError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, BurnError>;

    async fn send_transaction(&self, transaction: &VersionedTransaction)
        -> Result<Signature, BurnError>;

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, BurnError>;
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, BurnError> {
        Ok(RpcClient::get_balance(self, address).await?)
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<Option<u64>, BurnError> {
        match self.get_token_account_balance(token_account).await {
            Ok(ui_amount) => ui_amount
                .amount
                .parse::<u64>()
                .map(Some)
                .map_err(|e| BurnError::Decode(format!("token amount '{}': {}", ui_amount.amount, e))),
            Err(err) if is_account_missing(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, BurnError> {
        Ok(RpcClient::get_latest_blockhash(self).await?)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, BurnError> {
        RpcClient::send_transaction(self, transaction)
            .await
            .map_err(|err| match BurnError::from(err) {
                BurnError::Rpc(message) => BurnError::SubmissionFailed(message),
                other => other,
            })
    }

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, BurnError> {
        let statuses = self.get_signature_statuses(&[*signature]).await?;
        Ok(classify_status(
            statuses.value.into_iter().next().flatten(),
            commitment,
        ))
    }
}

/// Map a node-reported status onto [`SignatureState`] at `commitment`.
pub fn classify_status(
    status: Option<TransactionStatus>,
    commitment: CommitmentConfig,
) -> SignatureState {
    match status {
        None => SignatureState::Pending,
        Some(status) => match status.err {
            Some(err) => SignatureState::Failed(err.to_string()),
            None if status.satisfies_commitment(commitment) => SignatureState::Confirmed,
            None => SignatureState::Pending,
        },
    }
}

/// Fresh, never-cached balance reads through the retry executor.
pub struct BalanceReader {
    rpc: Arc<dyn ChainRpc>,
    retry: RetryPolicy,
}

impl BalanceReader {
    pub fn new(rpc: Arc<dyn ChainRpc>, retry: RetryPolicy) -> Self {
        Self { rpc, retry }
    }

    /// Native balance in lamports.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn read_native_balance(&self, address: &Pubkey) -> Result<u64, BurnError> {
        let balance = self
            .retry
            .execute("get_balance", || self.rpc.get_balance(address))
            .await?;
        debug!("Native balance: {} lamports", balance);
        Ok(balance)
    }

    /// Token balance in raw units; a missing account reads as zero.
    #[instrument(skip(self), fields(token_account = %token_account))]
    pub async fn read_token_balance(&self, token_account: &Pubkey) -> Result<u64, BurnError> {
        let balance = self
            .retry
            .execute("get_token_balance", || self.rpc.get_token_balance(token_account))
            .await?;
        match balance {
            Some(amount) => {
                debug!("Token balance: {}", amount);
                Ok(amount)
            }
            None => {
                debug!("Token account does not exist yet, treating balance as 0");
                Ok(0)
            }
        }
    }
}
