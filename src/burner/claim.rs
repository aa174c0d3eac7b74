//! Creator-fee reward claim against the pump.fun bonding-curve program.

use crate::burner::submitter::TransactionSubmitter;
use crate::burner::types::{TransactionOutcome, TransactionPayload};
use crate::types::Wallet;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use tracing::{info, instrument, warn};

/// pump.fun bonding-curve program.
pub const PUMP_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

/// Anchor discriminator of `collect_creator_fee`.
pub const COLLECT_CREATOR_FEE_DISCRIMINATOR: [u8; 8] = [20, 22, 86, 123, 198, 28, 219, 132];

const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";
const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";

pub fn creator_vault(creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CREATOR_VAULT_SEED, creator.as_ref()], &PUMP_PROGRAM_ID).0
}

pub fn event_authority() -> Pubkey {
    Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], &PUMP_PROGRAM_ID).0
}

/// The fixed-shape claim instruction for `creator`.
pub fn build_claim(creator: &Pubkey) -> Instruction {
    Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*creator, true),
            AccountMeta::new(creator_vault(creator), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(event_authority(), false),
            AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        ],
        data: COLLECT_CREATOR_FEE_DISCRIMINATOR.to_vec(),
    }
}

/// Claim accrued creator fees. The outcome is returned for reporting only.
#[instrument(skip(submitter, wallet), fields(creator = %wallet.pubkey()))]
pub async fn claim_reward(submitter: &TransactionSubmitter, wallet: &Wallet) -> TransactionOutcome {
    let ix = build_claim(&wallet.pubkey());
    let outcome = submitter
        .submit("claim", TransactionPayload::Instructions(vec![ix]), wallet)
        .await;
    match &outcome.error {
        None => info!("Creator fee claimed"),
        Some(err) => warn!("Creator fee claim failed: {}", err),
    }
    outcome
}
