//! Process-wide types: the wallet handle and the secret it is loaded from.

use anyhow::{anyhow, Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fmt;
use std::sync::Arc;

/// Secret key material as configured. `Debug` never prints it.
#[derive(Clone, PartialEq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Decode either a base58 string or a JSON byte array (`[12, 34, ...]`).
    pub fn to_keypair(&self) -> Result<Keypair> {
        let raw = self.0.trim();
        let bytes: Vec<u8> = if raw.starts_with('[') {
            serde_json::from_str(raw).context("PRIVATE_KEY is not a valid JSON byte array")?
        } else {
            bs58::decode(raw)
                .into_vec()
                .context("PRIVATE_KEY is not valid base58")?
        };
        if bytes.len() != 64 {
            return Err(anyhow!(
                "PRIVATE_KEY must decode to 64 bytes, got {}",
                bytes.len()
            ));
        }
        Keypair::from_bytes(&bytes).map_err(|e| anyhow!("PRIVATE_KEY is not a valid keypair: {}", e))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Signing capability plus public address. Cloning shares the keypair.
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn from_secret(secret: &SecretKey) -> Result<Self> {
        Ok(Self::new(secret.to_keypair()?))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Borrow the signer; key bytes never leave the handle.
    pub fn signer(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("pubkey", &self.pubkey()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_from_base58_and_json() {
        let keypair = Keypair::new();
        let base58 = SecretKey::new(keypair.to_base58_string());
        assert_eq!(base58.to_keypair().unwrap().pubkey(), keypair.pubkey());

        let json = SecretKey::new(serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap());
        assert_eq!(json.to_keypair().unwrap().pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_secret_rejects_garbage() {
        assert!(SecretKey::new("0OIl").to_keypair().is_err());
        assert!(SecretKey::new("[1, 2, 3]").to_keypair().is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let secret = SecretKey::new("super-secret");
        assert!(!format!("{:?}", secret).contains("super-secret"));
    }
}
