//! Burn instruction builder. Pure, no I/O.

use crate::burner::error::BurnError;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

/// Canonical token account holding `owner`'s balance of `mint`.
pub fn token_account_for(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Instruction destroying `amount` raw units from `token_account`.
///
/// A zero amount is rejected; callers decide whether there is anything to
/// burn before getting here.
pub fn build_burn(
    token_account: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<Instruction, BurnError> {
    if amount == 0 {
        return Err(BurnError::InvalidAmount(
            "burn amount must be greater than zero".to_string(),
        ));
    }
    spl_token::instruction::burn(&spl_token::id(), token_account, mint, owner, &[], amount)
        .map_err(|e| BurnError::InvalidAmount(format!("burn instruction: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SPL Token `Burn` instruction tag.
    const BURN_TAG: u8 = 8;

    #[test]
    fn test_burn_instruction_shape() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let account = token_account_for(&owner, &mint);

        let ix = build_burn(&account, &mint, &owner, 1_000_000).unwrap();

        assert_eq!(ix.program_id, spl_token::id());
        assert_eq!(ix.data[0], BURN_TAG);
        assert_eq!(&ix.data[1..9], &1_000_000u64.to_le_bytes());
        assert_eq!(ix.accounts[0].pubkey, account);
        assert!(ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, mint);
        assert_eq!(ix.accounts[2].pubkey, owner);
        assert!(ix.accounts[2].is_signer);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = build_burn(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid-amount");
    }

    #[test]
    fn test_token_account_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(token_account_for(&owner, &mint), token_account_for(&owner, &mint));
        assert_ne!(token_account_for(&owner, &mint), token_account_for(&mint, &owner));
    }
}
