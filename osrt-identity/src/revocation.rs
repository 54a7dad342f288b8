//! Revocation state: individually revoked `(address, nonce)` keys and a
//! monotonic per-address counter threshold. Persisted as one JSON document
//! analogous to the whitelist store.

use crate::error::StoreError;
use crate::secret_store::SecretStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

const SERVICE: &str = "com.osaurus.revocations";
const ACCOUNT: &str = "revocation-data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevocationState {
    #[serde(default, rename = "revokedKeys")]
    revoked_keys: HashSet<String>,
    #[serde(default, rename = "counterThresholds")]
    counter_thresholds: HashMap<String, u64>,
}

/// An immutable, cheaply-copyable view of revocation state, suitable for
/// constructing a validator per request without holding the store's lock
/// across the request.
#[derive(Clone)]
pub struct RevocationSnapshot(Arc<RevocationState>);

impl Default for RevocationSnapshot {
    /// An empty snapshot: nothing revoked, no thresholds raised.
    fn default() -> Self {
        RevocationSnapshot(Arc::new(RevocationState::default()))
    }
}

impl RevocationSnapshot {
    pub fn is_revoked(&self, address: &str, nonce: &str, counter: u64) -> bool {
        let key = revocation_key(address, nonce);
        if self.0.revoked_keys.contains(&key) {
            return true;
        }
        let threshold = self.0.counter_thresholds.get(&address.to_ascii_lowercase());
        matches!(threshold, Some(t) if counter <= *t)
    }
}

fn revocation_key(address: &str, nonce: &str) -> String {
    format!("{}:{}", address.to_ascii_lowercase(), nonce)
}

pub struct RevocationStore {
    store: Arc<dyn SecretStore>,
    state: RwLock<RevocationState>,
}

impl RevocationStore {
    pub fn load(store: Arc<dyn SecretStore>) -> Result<Self, StoreError> {
        let state = match store.read(SERVICE, ACCOUNT)? {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "revocation store: slot malformed, starting empty");
                RevocationState::default()
            }),
            None => RevocationState::default(),
        };
        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.state.read().unwrap().clone();
        let json = serde_json::to_vec(&snapshot).expect("RevocationState always serializes");
        self.store.write(SERVICE, ACCOUNT, &json)
    }

    pub fn revoke_key(&self, address: &str, nonce: &str) -> Result<(), StoreError> {
        self.state
            .write()
            .unwrap()
            .revoked_keys
            .insert(revocation_key(address, nonce));
        self.persist()
    }

    /// Raise `address`'s counter threshold to `max(existing, n)`. Thresholds
    /// never decrease.
    pub fn revoke_all_before(&self, address: &str, n: u64) -> Result<(), StoreError> {
        let key = address.to_ascii_lowercase();
        let mut state = self.state.write().unwrap();
        let entry = state.counter_thresholds.entry(key).or_insert(0);
        *entry = (*entry).max(n);
        drop(state);
        self.persist()
    }

    pub fn threshold_for(&self, address: &str) -> u64 {
        self.state
            .read()
            .unwrap()
            .counter_thresholds
            .get(&address.to_ascii_lowercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn is_revoked(&self, address: &str, nonce: &str, counter: u64) -> bool {
        self.snapshot().is_revoked(address, nonce, counter)
    }

    pub fn snapshot(&self) -> RevocationSnapshot {
        RevocationSnapshot(Arc::new(self.state.read().unwrap().clone()))
    }
}
