//! Wallet management module

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;
use std::sync::Arc;

/// Read-only signing key shared by every flow
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Load a keypair file
    ///
    /// Accepts the Solana CLI JSON array, raw 64 bytes, or a base58-encoded
    /// secret key. All-zero keys are rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;
        let secret = parse_secret(&keypair_bytes)?;

        if secret.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", secret.len());
        }
        if secret.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(secret.as_slice()).context("Invalid keypair bytes")?;

        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

fn parse_secret(contents: &[u8]) -> Result<Vec<u8>> {
    if contents.len() == 64 {
        return Ok(contents.to_vec());
    }
    let text = std::str::from_utf8(contents)
        .context("Keypair file is neither 64 raw bytes nor text")?
        .trim();
    if text.starts_with('[') {
        return serde_json::from_str(text).context("Failed to parse keypair JSON");
    }
    bs58::decode(text)
        .into_vec()
        .context("Failed to decode base58 keypair")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_load_json_keypair() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let file = write_temp(json.as_bytes());

        let wallet = WalletManager::from_file(file.path()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_raw_and_base58_keypair() {
        let keypair = Keypair::new();
        let raw = write_temp(&keypair.to_bytes());
        assert_eq!(WalletManager::from_file(raw.path()).unwrap().pubkey(), keypair.pubkey());

        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let text = write_temp(encoded.as_bytes());
        assert_eq!(WalletManager::from_file(text.path()).unwrap().pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_zero_and_short_keys() {
        let zero = write_temp(&[0u8; 64]);
        assert!(WalletManager::from_file(zero.path()).is_err());

        let short = write_temp(b"[1,2,3]");
        assert!(WalletManager::from_file(short.path()).is_err());

        assert!(WalletManager::from_file("/nonexistent/id.json").is_err());
    }

    #[test]
    fn test_shared_keypair() {
        let wallet = WalletManager::from_keypair(Keypair::new());
        let clone = wallet.clone();
        assert!(std::ptr::eq(wallet.keypair(), clone.keypair()));
    }
}
