//! Keyed secret storage, abstracting over the OS keychain the production
//! host would use. `FileSecretStore` gives every `(service, account)` slot
//! its own file under a data root, written atomically (tmp file + rename)
//! the same way the rest of this workspace persists durable state.

use crate::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait SecretStore: Send + Sync {
    fn read(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// Durable, file-backed secret store. One file per slot under `root`,
/// named `<service>__<account>.bin` with non-alphanumeric characters
/// replaced so the slot maps cleanly onto a filesystem path.
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, service: &str, account: &str) -> PathBuf {
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
                .collect()
        };
        self.root
            .join(format!("{}__{}.bin", sanitize(service), sanitize(account)))
    }
}

impl SecretStore for FileSecretStore {
    fn read(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.slot_path(service, account);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::SecretReadFailed {
                service: service.to_string(),
                account: account.to_string(),
                source: e.to_string(),
            }),
        }
    }

    fn write(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.slot_path(service, account);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::SecretWriteFailed {
                service: service.to_string(),
                account: account.to_string(),
                source: e.to_string(),
            })?;
        }
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, data).map_err(|e| StoreError::SecretWriteFailed {
            service: service.to_string(),
            account: account.to_string(),
            source: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::SecretWriteFailed {
            service: service.to_string(),
            account: account.to_string(),
            source: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "secret store: slot written");
        Ok(())
    }
}

/// Non-durable store for unit tests and in-process demos.
#[derive(Default)]
pub struct InMemorySecretStore {
    slots: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for InMemorySecretStore {
    fn read(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let slots = self.slots.lock().unwrap();
        Ok(slots.get(&(service.to_string(), account.to_string())).cloned())
    }

    fn write(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap();
        slots.insert((service.to_string(), account.to_string()), data.to_vec());
        Ok(())
    }
}
