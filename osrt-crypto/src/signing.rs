//! Domain-separated message signing and address recovery.
//!
//! The envelope format is `"\x19" + prefix + ":\n" + decimal(len) + payload`,
//! hashed with Keccak-256 and fed to secp256k1 ECDSA with a recoverable
//! signature (64-byte compact `r‖s` plus a trailing `recoveryId + 27` byte).
//! The two domain prefixes are deliberately not interchangeable: a signature
//! produced under one prefix must not recover the signer's address when
//! verified under the other.

use crate::address::Address;
use crate::error::CryptoError;
use crate::keccak::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

/// Domain prefix for user-facing signed payloads.
pub const PREFIX_MESSAGE: &str = "Osaurus Signed Message";
/// Domain prefix for access-key claim envelopes.
pub const PREFIX_ACCESS: &str = "Osaurus Signed Access";

fn envelope(prefix: &str, payload: &[u8]) -> Vec<u8> {
    let len_str = payload.len().to_string();
    let mut out = Vec::with_capacity(1 + prefix.len() + 2 + len_str.len() + payload.len());
    out.push(0x19);
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(b":\n");
    out.extend_from_slice(len_str.as_bytes());
    out.extend_from_slice(payload);
    out
}

/// Sign `payload` under `prefix` with a raw 32-byte secp256k1 private key.
/// Returns a 65-byte `r‖s‖v` signature, `v = recoveryId + 27`.
pub fn sign_with_prefix(
    private_key: &[u8; 32],
    payload: &[u8],
    prefix: &str,
) -> Result<[u8; 65], CryptoError> {
    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|e| CryptoError::SigningFailed(format!("malformed private key: {e}")))?;
    let hash = keccak256(&envelope(prefix, payload));
    let (sig, recid) = signing_key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte() + 27;
    Ok(out)
}

/// Recover the signer's address from a 65-byte signature over `payload`
/// under `prefix`. Fails with `SigningFailed` on malformed input and
/// `AddressRecoveryFailed` when recovery does not yield a valid point.
pub fn recover_address_with_prefix(
    payload: &[u8],
    signature: &[u8],
    prefix: &str,
) -> Result<Address, CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::SigningFailed(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let v = signature[64];
    if v < 27 {
        return Err(CryptoError::SigningFailed(
            "recovery byte underflows 27".to_string(),
        ));
    }
    let recid = RecoveryId::from_byte(v - 27)
        .ok_or_else(|| CryptoError::AddressRecoveryFailed("invalid recovery id".to_string()))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::AddressRecoveryFailed(format!("malformed signature: {e}")))?;

    let hash = keccak256(&envelope(prefix, payload));
    let verifying_key = VerifyingKey::recover_from_prehash(&hash, &sig, recid)
        .map_err(|e| CryptoError::AddressRecoveryFailed(e.to_string()))?;

    let encoded = verifying_key.to_encoded_point(false);
    Address::from_uncompressed_pubkey(encoded.as_bytes())
        .ok_or_else(|| CryptoError::AddressRecoveryFailed("recovered key malformed".to_string()))
}

/// The address corresponding to a raw private key, independent of any
/// signature — used to compare a recovered signer against the expected
/// owner of a key.
pub fn address_from_private_key(private_key: &[u8; 32]) -> Result<Address, CryptoError> {
    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|e| CryptoError::SigningFailed(format!("malformed private key: {e}")))?;
    let verifying_key = VerifyingKey::from(&signing_key);
    let encoded = verifying_key.to_encoded_point(false);
    Address::from_uncompressed_pubkey(encoded.as_bytes())
        .ok_or_else(|| CryptoError::SigningFailed("derived key malformed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(seed: u8) -> [u8; 32] {
        let mut k = [0u8; 32];
        k.fill(seed);
        k[31] = k[31].wrapping_add(1); // avoid the all-zero scalar
        k
    }

    #[test]
    fn sign_then_recover_yields_signer_address() {
        let key = test_key(7);
        let expected = address_from_private_key(&key).unwrap();
        let sig = sign_with_prefix(&key, b"payload", PREFIX_MESSAGE).unwrap();
        let recovered = recover_address_with_prefix(b"payload", &sig, PREFIX_MESSAGE).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn recovery_byte_is_27_or_28() {
        let key = test_key(3);
        let sig = sign_with_prefix(&key, b"x", PREFIX_ACCESS).unwrap();
        assert!(sig[64] == 27 || sig[64] == 28);
    }

    #[test]
    fn different_prefixes_produce_different_signatures() {
        let key = test_key(9);
        let a = sign_with_prefix(&key, b"test", PREFIX_MESSAGE).unwrap();
        let b = sign_with_prefix(&key, b"test", PREFIX_ACCESS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn recovery_under_wrong_prefix_does_not_match_signer() {
        let key = test_key(11);
        let expected = address_from_private_key(&key).unwrap();
        let sig = sign_with_prefix(&key, b"test", PREFIX_MESSAGE).unwrap();
        let recovered = recover_address_with_prefix(b"test", &sig, PREFIX_ACCESS).unwrap();
        assert_ne!(recovered, expected);
    }

    #[test]
    fn rejects_wrong_length_signature() {
        let err = recover_address_with_prefix(b"x", &[0u8; 64], PREFIX_MESSAGE).unwrap_err();
        assert!(matches!(err, CryptoError::SigningFailed(_)));
    }

    #[test]
    fn rejects_malformed_private_key() {
        let zero_key = [0u8; 32];
        assert!(sign_with_prefix(&zero_key, b"x", PREFIX_MESSAGE).is_err());
    }
}
