//! 20-byte addresses derived from uncompressed secp256k1 public keys, with
//! EIP-55-style mixed-case checksum encoding.

use crate::keccak::keccak256;
use std::fmt;

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Derive an address from an uncompressed secp256k1 public key
    /// (65 bytes, leading `0x04` tag included).
    pub fn from_uncompressed_pubkey(pubkey: &[u8]) -> Option<Self> {
        if pubkey.len() != 65 || pubkey[0] != 0x04 {
            return None;
        }
        let digest = keccak256(&pubkey[1..65]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..32]);
        Some(Address(bytes))
    }

    /// Lowercase hex form, no `0x` prefix.
    pub fn to_lowercase_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Mixed-case checksum form, e.g. `0x5aAe...`.
    pub fn to_checksum_string(&self) -> String {
        checksum_encode(&self.to_lowercase_hex())
    }

    /// Parse either a checksummed or plain-lowercase `0x`-prefixed hex
    /// address. Checksum casing is not validated on decode — callers that
    /// need to verify casing should compare against `to_checksum_string`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 40 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Some(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_string())
    }
}

/// Pure function of the lowercase hex string: upper-case nibble `i` when the
/// `i`-th nibble of `keccak256(utf8(lowercaseHex))` is >= 8.
pub fn checksum_encode(lowercase_hex: &str) -> String {
    let hash = keccak256(lowercase_hex.as_bytes());
    let mut out = String::with_capacity(2 + lowercase_hex.len());
    out.push_str("0x");
    for (i, ch) in lowercase_hex.chars().enumerate() {
        if ch.is_ascii_alphabetic() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_round_trips_to_same_bytes() {
        let addr = Address([0xab; 20]);
        let checksum = addr.to_checksum_string();
        let parsed = Address::parse(&checksum).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn checksum_is_pure_function_of_lowercase_hex() {
        let a = checksum_encode("5aae00000000000000000000000000deadbeef");
        let b = checksum_encode("5aae00000000000000000000000000deadbeef");
        assert_eq!(a, b);
    }

    #[test]
    fn checksum_preserves_digits() {
        let lower = "0123456789012345678901234567890123456789";
        let checksum = checksum_encode(lower);
        assert_eq!(&checksum[2..], lower);
    }

    #[test]
    fn from_pubkey_rejects_wrong_length() {
        assert!(Address::from_uncompressed_pubkey(&[0u8; 64]).is_none());
    }

    #[test]
    fn from_pubkey_rejects_missing_tag() {
        let mut pk = [0u8; 65];
        pk[0] = 0x02;
        assert!(Address::from_uncompressed_pubkey(&pk).is_none());
    }

    #[test]
    fn parse_accepts_with_and_without_prefix() {
        let addr = Address([0x11; 20]);
        let hex_str = addr.to_lowercase_hex();
        assert_eq!(Address::parse(&hex_str), Some(addr));
        assert_eq!(Address::parse(&format!("0x{hex_str}")), Some(addr));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(Address::parse("0xabcd").is_none());
    }
}
