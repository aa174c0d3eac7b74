//! Transaction submitter.
//!
//! Normalizes a [`TransactionPayload`] into one signed transaction against a
//! fresh blockhash, sends it and waits a bounded time for confirmation. A
//! failed send or confirmation is reported, never resubmitted: a new attempt
//! has to start over with a new blockhash.

use crate::burner::error::BurnError;
use crate::burner::retry::RetryPolicy;
use crate::burner::rpc::{ChainRpc, SignatureState};
use crate::burner::types::{TransactionOutcome, TransactionPayload};
use crate::types::Wallet;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

pub struct TransactionSubmitter {
    rpc: Arc<dyn ChainRpc>,
    retry: RetryPolicy,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        retry: RetryPolicy,
        commitment: CommitmentConfig,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            rpc,
            retry,
            commitment,
            confirm_timeout,
            poll_interval,
        }
    }

    /// Blockhash, assemble, sign, send, confirm.
    #[instrument(skip(self, payload, wallet))]
    pub async fn submit(
        &self,
        label: &str,
        payload: TransactionPayload,
        wallet: &Wallet,
    ) -> TransactionOutcome {
        let blockhash = match self
            .retry
            .execute("get_latest_blockhash", || self.rpc.get_latest_blockhash())
            .await
        {
            Ok(hash) => hash,
            Err(err) => return TransactionOutcome::failed(None, err),
        };

        let transaction = match prepare_transaction(payload, blockhash, wallet) {
            Ok(tx) => tx,
            Err(err) => return TransactionOutcome::failed(None, err),
        };

        let signature = match self
            .retry
            .execute("send_transaction", || self.rpc.send_transaction(&transaction))
            .await
        {
            Ok(signature) => signature,
            Err(err) => {
                warn!("{} submission failed: {}", label, err);
                let err = match err {
                    BurnError::Rpc(message) => BurnError::SubmissionFailed(message),
                    other => other,
                };
                return TransactionOutcome::failed(None, err);
            }
        };
        info!("{} transaction sent: {}", label, signature);

        match self.await_confirmation(&signature).await {
            Ok(()) => {
                info!("{} transaction confirmed: {}", label, signature);
                TransactionOutcome::confirmed(signature)
            }
            Err(err) => {
                warn!("{} transaction {} not confirmed: {}", label, signature, err);
                TransactionOutcome::failed(Some(signature), err)
            }
        }
    }

    /// Wait for the signature, bounded by the confirmation timeout.
    async fn await_confirmation(&self, signature: &Signature) -> Result<(), BurnError> {
        match timeout(self.confirm_timeout, self.poll_confirmation(signature)).await {
            Ok(result) => result,
            Err(_) => Err(BurnError::ConfirmationTimeout(self.confirm_timeout.as_secs())),
        }
    }

    /// Poll until the signature reaches the commitment or errors on chain.
    async fn poll_confirmation(&self, signature: &Signature) -> Result<(), BurnError> {
        loop {
            let state = self
                .retry
                .execute("signature_status", || {
                    self.rpc.signature_state(signature, self.commitment)
                })
                .await?;
            match state {
                SignatureState::Confirmed => return Ok(()),
                SignatureState::Failed(reason) => return Err(BurnError::ConfirmationFailed(reason)),
                SignatureState::Pending => {
                    debug!("Signature {} pending", signature);
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}

/// Turn either payload shape into one transaction signed by `wallet`.
pub fn prepare_transaction(
    payload: TransactionPayload,
    blockhash: Hash,
    wallet: &Wallet,
) -> Result<VersionedTransaction, BurnError> {
    match payload {
        TransactionPayload::Prebuilt(prebuilt) => {
            let mut message = prebuilt.message;
            let fee_payer = message.static_account_keys().first().copied();
            if fee_payer != Some(wallet.pubkey()) {
                return Err(BurnError::SubmissionFailed(format!(
                    "prebuilt transaction fee payer {:?} is not the wallet {}",
                    fee_payer,
                    wallet.pubkey()
                )));
            }
            message.set_recent_blockhash(blockhash);
            VersionedTransaction::try_new(message, &[wallet.signer()])
                .map_err(|e| BurnError::SubmissionFailed(format!("signing failed: {}", e)))
        }
        TransactionPayload::Instructions(instructions) => {
            if instructions.is_empty() {
                return Err(BurnError::SubmissionFailed(
                    "no instructions to submit".to_string(),
                ));
            }
            let payer = wallet.pubkey();
            let message = Message::new(&instructions, Some(&payer));
            let mut transaction = Transaction::new_unsigned(message);
            transaction
                .try_sign(&[wallet.signer()], blockhash)
                .map_err(|e| BurnError::SubmissionFailed(format!("signing failed: {}", e)))?;
            Ok(VersionedTransaction::from(transaction))
        }
    }
}
