//! Master and per-agent whitelists, persisted as one JSON document in a
//! single secret-store slot. Reads never block on the writer lock for
//! longer than a snapshot clone; writes are serialised through the same
//! lock and the new state is flushed to the store before returning.

use crate::error::StoreError;
use crate::secret_store::SecretStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

const SERVICE: &str = "com.osaurus.whitelist";
const ACCOUNT: &str = "whitelist-data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistState {
    #[serde(default)]
    master: HashSet<String>,
    #[serde(default, rename = "perAgent")]
    per_agent: HashMap<String, HashSet<String>>,
}

pub struct WhitelistStore {
    store: Arc<dyn SecretStore>,
    state: RwLock<WhitelistState>,
}

fn lower(addr: &str) -> String {
    addr.to_ascii_lowercase()
}

impl WhitelistStore {
    /// Load the whitelist from `store`, starting empty if the slot is
    /// absent or malformed (logged, not fatal — mirrors how persisted
    /// state is restored elsewhere in this workspace).
    pub fn load(store: Arc<dyn SecretStore>) -> Result<Self, StoreError> {
        let state = match store.read(SERVICE, ACCOUNT)? {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "whitelist store: slot malformed, starting empty");
                WhitelistState::default()
            }),
            None => WhitelistState::default(),
        };
        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.state.read().unwrap().clone();
        let json = serde_json::to_vec(&snapshot).expect("WhitelistState always serializes");
        self.store.write(SERVICE, ACCOUNT, &json)
    }

    pub fn add_master(&self, address: &str) -> Result<(), StoreError> {
        self.state.write().unwrap().master.insert(lower(address));
        self.persist()
    }

    pub fn remove_master(&self, address: &str) -> Result<(), StoreError> {
        self.state.write().unwrap().master.remove(&lower(address));
        self.persist()
    }

    pub fn add_agent(&self, agent: &str, address: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state
            .per_agent
            .entry(lower(agent))
            .or_default()
            .insert(lower(address));
        drop(state);
        self.persist()
    }

    /// Remove `address` from `agent`'s override set; prunes the entry
    /// entirely once its set becomes empty.
    pub fn remove_agent(&self, agent: &str, address: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        let agent_key = lower(agent);
        if let Some(set) = state.per_agent.get_mut(&agent_key) {
            set.remove(&lower(address));
            if set.is_empty() {
                state.per_agent.remove(&agent_key);
            }
        }
        drop(state);
        self.persist()
    }

    pub fn master_whitelist(&self) -> HashSet<String> {
        self.state.read().unwrap().master.clone()
    }

    pub fn agent_whitelist(&self, agent: &str) -> HashSet<String> {
        self.state
            .read()
            .unwrap()
            .per_agent
            .get(&lower(agent))
            .cloned()
            .unwrap_or_default()
    }

    /// `master ∪ perAgent[agent] ∪ {agent, master}`, all lowercased.
    pub fn effective_whitelist(&self, agent: &str, master: &str) -> HashSet<String> {
        let state = self.state.read().unwrap();
        let mut out = state.master.clone();
        if let Some(set) = state.per_agent.get(&lower(agent)) {
            out.extend(set.iter().cloned());
        }
        out.insert(lower(agent));
        out.insert(lower(master));
        out
    }
}
