//! Zeroizing buffer for master-key material.

use crate::error::CryptoError;
use rand::RngCore;
use zeroize::Zeroize;

/// Owns 32 bytes of master-key material and overwrites them with zeros on
/// drop. Derefs to `&[u8]` for use with the derivation and signing
/// functions, which never persist or clone the key beyond the current call.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKeyGuard([u8; 32]);

impl MasterKeyGuard {
    /// Generate 32 bytes of fresh randomness from the OS RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| CryptoError::RandomFailed)?;
        Ok(Self(bytes))
    }

    /// Wrap existing key bytes, e.g. one loaded from the secret store.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for MasterKeyGuard {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKeyGuard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_32_bytes() {
        let key = MasterKeyGuard::generate().unwrap();
        assert_eq!(key.as_bytes().len(), 32);
    }

    #[test]
    fn two_generated_keys_differ() {
        let a = MasterKeyGuard::generate().unwrap();
        let b = MasterKeyGuard::generate().unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn from_bytes_round_trips() {
        let bytes = [0x5au8; 32];
        let key = MasterKeyGuard::from_bytes(bytes);
        assert_eq!(key.as_bytes(), &bytes);
    }
}
