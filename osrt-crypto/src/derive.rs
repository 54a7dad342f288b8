//! Hierarchical per-agent key derivation from a single master secret.
//!
//! Agent keys are never persisted — every signing operation re-derives the
//! 32-byte child key from the master key and the agent index, then drops it.

use crate::address::Address;
use crate::error::CryptoError;
use crate::signing::{self, PREFIX_ACCESS};
use hmac::{Hmac, Mac};
use sha2::Sha512;

const DOMAIN_TAG: &[u8] = b"osaurus-agent-v1";

type HmacSha512 = Hmac<Sha512>;

/// `childKey = firstBytes(HMAC_SHA512(masterKey, "osaurus-agent-v1" || be32(index)), 32)`.
///
/// Valid for any `index` in `[0, 2^32)`; always returns 32 bytes.
pub fn derive_agent_key(master_key: &[u8], index: u32) -> [u8; 32] {
    let mut mac =
        HmacSha512::new_from_slice(master_key).expect("HMAC accepts keys of any length");
    mac.update(DOMAIN_TAG);
    mac.update(&index.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let mut child = [0u8; 32];
    child.copy_from_slice(&digest[..32]);
    child
}

/// Derive the agent's address for `index` under `master_key`.
pub fn derive_address(master_key: &[u8], index: u32) -> Result<Address, CryptoError> {
    let child = derive_agent_key(master_key, index);
    signing::address_from_private_key(&child)
}

/// Derive the agent key for `index` and sign `payload` under the
/// access-key domain prefix.
pub fn sign(master_key: &[u8], index: u32, payload: &[u8]) -> Result<[u8; 65], CryptoError> {
    let child = derive_agent_key(master_key, index);
    signing::sign_with_prefix(&child, payload, PREFIX_ACCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_always_returns_32_bytes() {
        let master = b"some master secret bytes";
        for index in [0u32, 1, 42, u32::MAX] {
            assert_eq!(derive_agent_key(master, index).len(), 32);
        }
    }

    #[test]
    fn different_indices_derive_different_keys() {
        let master = b"shared master secret";
        let a = derive_agent_key(master, 0);
        let b = derive_agent_key(master, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn derivation_is_deterministic() {
        let master = b"shared master secret";
        assert_eq!(derive_agent_key(master, 5), derive_agent_key(master, 5));
    }

    #[test]
    fn agent_address_differs_from_master_address() {
        let master_secret = b"this is the master secret material";
        // Treat a Keccak-derived 32 bytes as the master's own signing key
        // purely for this comparison; real master keys are random.
        let master_priv = crate::keccak::keccak256(master_secret);
        let master_addr = signing::address_from_private_key(&master_priv).unwrap();
        let agent_addr = derive_address(master_secret, 0).unwrap();
        assert_ne!(master_addr, agent_addr);
    }

    #[test]
    fn sign_then_recover_matches_derived_address() {
        let master = b"master secret for signing test";
        let expected = derive_address(master, 3).unwrap();
        let sig = sign(master, 3, b"claims payload").unwrap();
        let recovered =
            signing::recover_address_with_prefix(b"claims payload", &sig, PREFIX_ACCESS).unwrap();
        assert_eq!(recovered, expected);
    }
}
