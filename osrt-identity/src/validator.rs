//! Bearer access-key validation: recover the signer, check whitelist
//! membership, revocation, and strict counter monotonicity.
//!
//! A bearer token is `base64url(claims_json) + "." + base64url(signature)`,
//! where `claims_json` is the signed payload (the envelope is built over
//! these raw bytes) and `signature` is the 65-byte recoverable signature
//! produced under the access-key domain prefix.

use crate::counter::CounterStore;
use crate::error::ValidatorError;
use crate::revocation::RevocationSnapshot;
use base64::Engine;
use osrt_crypto::signing::{recover_address_with_prefix, PREFIX_ACCESS};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

fn b64_decode(s: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s).ok()
}

#[derive(Debug, Deserialize)]
struct AccessKeyClaims {
    nonce: String,
    counter: u64,
}

pub struct AccessKeyValidator {
    agent_address: String,
    master_address: String,
    effective_whitelist: HashSet<String>,
    revocation: RevocationSnapshot,
    counters: Arc<CounterStore>,
    has_keys: bool,
}

impl AccessKeyValidator {
    pub fn new(
        agent_address: String,
        master_address: String,
        effective_whitelist: HashSet<String>,
        revocation: RevocationSnapshot,
        counters: Arc<CounterStore>,
        has_keys: bool,
    ) -> Self {
        Self {
            agent_address: agent_address.to_ascii_lowercase(),
            master_address: master_address.to_ascii_lowercase(),
            effective_whitelist,
            revocation,
            counters,
            has_keys,
        }
    }

    /// Rejects everything — used when no account exists on this device.
    pub fn empty() -> Self {
        Self {
            agent_address: String::new(),
            master_address: String::new(),
            effective_whitelist: HashSet::new(),
            revocation: RevocationSnapshot::default(),
            counters: Arc::new(CounterStore::new()),
            has_keys: false,
        }
    }

    pub fn validate(&self, bearer_token: &str) -> Result<String, ValidatorError> {
        if !self.has_keys {
            return Err(ValidatorError::NoAccount);
        }

        let (payload_part, sig_part) = bearer_token
            .split_once('.')
            .ok_or(ValidatorError::BadSignature)?;
        let payload = b64_decode(payload_part).ok_or(ValidatorError::BadSignature)?;
        let signature = b64_decode(sig_part).ok_or(ValidatorError::BadSignature)?;

        let signer = recover_address_with_prefix(&payload, &signature, PREFIX_ACCESS)
            .map_err(|_| ValidatorError::BadSignature)?;
        let signer_hex = signer.to_lowercase_hex();
        let signer_checked = format!("0x{signer_hex}");

        let claims: AccessKeyClaims =
            serde_json::from_slice(&payload).map_err(|_| ValidatorError::BadSignature)?;

        if !self.effective_whitelist.contains(&signer_checked) {
            return Err(ValidatorError::NotWhitelisted);
        }

        if self
            .revocation
            .is_revoked(&signer_checked, &claims.nonce, claims.counter)
        {
            return Err(ValidatorError::Revoked);
        }

        if !self.counters.check_and_advance(&signer_checked, claims.counter) {
            return Err(ValidatorError::ReplayedCounter);
        }

        Ok(signer_checked)
    }

    pub fn agent_address(&self) -> &str {
        &self.agent_address
    }

    pub fn master_address(&self) -> &str {
        &self.master_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::RevocationStore;
    use crate::secret_store::InMemorySecretStore;
    use osrt_crypto::derive::derive_address;
    use osrt_crypto::signing::sign_with_prefix;
    use serde_json::json;

    fn token_for(private_key: &[u8; 32], nonce: &str, counter: u64) -> (String, String) {
        let claims = json!({ "nonce": nonce, "counter": counter });
        let payload = serde_json::to_vec(&claims).unwrap();
        let sig = sign_with_prefix(private_key, &payload, PREFIX_ACCESS).unwrap();
        let token = format!(
            "{}.{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&payload),
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(sig),
        );
        let signer = osrt_crypto::signing::address_from_private_key(private_key).unwrap();
        (token, format!("0x{}", signer.to_lowercase_hex()))
    }

    fn priv_key(seed: u8) -> [u8; 32] {
        let mut k = [seed; 32];
        k[31] = k[31].wrapping_add(1);
        k
    }

    #[test]
    fn empty_validator_rejects_everything() {
        let validator = AccessKeyValidator::empty();
        let (token, _) = token_for(&priv_key(1), "n1", 1);
        assert_eq!(validator.validate(&token), Err(ValidatorError::NoAccount));
    }

    #[test]
    fn whitelisted_signer_with_fresh_counter_is_admitted() {
        let key = priv_key(2);
        let (token, signer) = token_for(&key, "n1", 1);
        let mut whitelist = HashSet::new();
        whitelist.insert(signer.clone());
        let revocation = RevocationStore::load(Arc::new(InMemorySecretStore::new()))
            .unwrap()
            .snapshot();
        let validator = AccessKeyValidator::new(
            signer.clone(),
            "0xmaster".to_string(),
            whitelist,
            revocation,
            Arc::new(CounterStore::new()),
            true,
        );
        assert_eq!(validator.validate(&token), Ok(signer));
    }

    #[test]
    fn signer_not_in_whitelist_is_rejected() {
        let key = priv_key(3);
        let (token, _) = token_for(&key, "n1", 1);
        let revocation = RevocationStore::load(Arc::new(InMemorySecretStore::new()))
            .unwrap()
            .snapshot();
        let validator = AccessKeyValidator::new(
            "0xagent".to_string(),
            "0xmaster".to_string(),
            HashSet::new(),
            revocation,
            Arc::new(CounterStore::new()),
            true,
        );
        assert_eq!(validator.validate(&token), Err(ValidatorError::NotWhitelisted));
    }

    #[test]
    fn revoked_signer_is_rejected() {
        let key = priv_key(4);
        let (token, signer) = token_for(&key, "n1", 1);
        let store = RevocationStore::load(Arc::new(InMemorySecretStore::new())).unwrap();
        store.revoke_key(&signer, "n1").unwrap();
        let mut whitelist = HashSet::new();
        whitelist.insert(signer.clone());
        let validator = AccessKeyValidator::new(
            signer,
            "0xmaster".to_string(),
            whitelist,
            store.snapshot(),
            Arc::new(CounterStore::new()),
            true,
        );
        assert_eq!(validator.validate(&token), Err(ValidatorError::Revoked));
    }

    #[test]
    fn replayed_counter_is_rejected() {
        let key = priv_key(5);
        let (token1, signer) = token_for(&key, "n1", 1);
        let (token2, _) = token_for(&key, "n2", 1); // same counter value
        let mut whitelist = HashSet::new();
        whitelist.insert(signer.clone());
        let revocation = RevocationStore::load(Arc::new(InMemorySecretStore::new()))
            .unwrap()
            .snapshot();
        let counters = Arc::new(CounterStore::new());
        let validator = AccessKeyValidator::new(
            signer,
            "0xmaster".to_string(),
            whitelist,
            revocation,
            counters,
            true,
        );
        assert!(validator.validate(&token1).is_ok());
        assert_eq!(validator.validate(&token2), Err(ValidatorError::ReplayedCounter));
    }

    #[test]
    fn malformed_token_is_bad_signature() {
        let validator = AccessKeyValidator::new(
            "0xagent".into(),
            "0xmaster".into(),
            HashSet::new(),
            RevocationStore::load(Arc::new(InMemorySecretStore::new()))
                .unwrap()
                .snapshot(),
            Arc::new(CounterStore::new()),
            true,
        );
        assert_eq!(validator.validate("not-a-token"), Err(ValidatorError::BadSignature));
    }

    #[test]
    fn effective_whitelist_derivation_matches_agent_address() {
        let master = b"the master secret";
        let agent_addr = derive_address(master, 0).unwrap();
        assert_eq!(agent_addr.to_lowercase_hex().len(), 40);
    }
}
