//! Runtime-mutable table of loaded plugins: install, uninstall, reload,
//! list. Unlike a router built once and shared by reference, plugins can
//! come and go while the host runs.

use crate::error::LoaderError;
use crate::loader::{find_single_library, load_plugin};
use crate::package::{install_package, uninstall_package};
use dashmap::DashMap;
use osrt_core::PluginManifest;
use osrt_identity::SecretStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// A lightweight, serialisable snapshot of a loaded plugin, for listing
/// surfaces that shouldn't see the raw ABI pointers.
#[derive(Debug, Clone, Serialize)]
pub struct PluginRecord {
    pub plugin_id: String,
    pub version: Option<String>,
    pub manifest: PluginManifest,
    pub abi_version: u32,
    pub install_path: PathBuf,
    /// RFC 3339 timestamp of the most recent (re)load.
    pub loaded_at: String,
    /// Bumped every time this plugin is (re)loaded. A dispatcher holding a
    /// reference from before a reload can compare generations to detect
    /// that the plugin underneath it was swapped out mid-flight.
    pub generation: u64,
}

struct Slot {
    loaded: crate::loader::LoadedPlugin,
    generation: u64,
    loaded_at: String,
}

pub struct PluginRegistry {
    tools_root: PathBuf,
    data_root: PathBuf,
    secrets: Arc<dyn SecretStore>,
    loaded: DashMap<String, Slot>,
    /// Per-plugin generation counters, kept independently of `loaded` so a
    /// counter survives an unload and keeps climbing across reinstalls.
    generations: DashMap<String, u64>,
}

impl PluginRegistry {
    pub fn new(tools_root: PathBuf, data_root: PathBuf, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            tools_root,
            data_root,
            secrets,
            loaded: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    fn record(slot: &Slot) -> PluginRecord {
        let loaded = &slot.loaded;
        PluginRecord {
            plugin_id: loaded.plugin_id.clone(),
            version: loaded.manifest.version.clone(),
            manifest: loaded.manifest.clone(),
            abi_version: loaded.abi_version,
            install_path: loaded.install_path.clone(),
            loaded_at: slot.loaded_at.clone(),
            generation: slot.generation,
        }
    }

    /// Extracts a package zip and loads it, replacing any existing version
    /// of the same plugin.
    pub fn install_from_zip(
        &self,
        zip_path: &std::path::Path,
        plugin_id: &str,
        version: &str,
    ) -> Result<PluginRecord, LoaderError> {
        let install_dir = install_package(zip_path, &self.tools_root, plugin_id, version)?;
        self.load_from_dir(plugin_id, &install_dir)
    }

    /// Loads the single dylib found under `install_dir` for `plugin_id`,
    /// unloading any previous instance first.
    pub fn load_from_dir(
        &self,
        plugin_id: &str,
        install_dir: &std::path::Path,
    ) -> Result<PluginRecord, LoaderError> {
        if self.loaded.contains_key(plugin_id) {
            self.unload(plugin_id);
        }

        let library_path = find_single_library(install_dir)?;
        let loaded = load_plugin(plugin_id, &library_path, &self.data_root, Arc::clone(&self.secrets))?;

        let generation = {
            let mut entry = self.generations.entry(plugin_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        let slot = Slot {
            loaded_at: chrono::Utc::now().to_rfc3339(),
            generation,
            loaded,
        };
        let record = Self::record(&slot);
        tracing::info!(plugin = %plugin_id, abi_version = record.abi_version, generation, "plugin loaded");
        self.loaded.insert(plugin_id.to_string(), slot);
        Ok(record)
    }

    /// Unloads (if present) and removes the plugin's entire install tree.
    pub fn uninstall(&self, plugin_id: &str) -> std::io::Result<()> {
        self.unload(plugin_id);
        uninstall_package(&self.tools_root, plugin_id)
    }

    /// Unloads the currently loaded instance, if any. The plugin's
    /// generation counter is preserved so a later reload keeps climbing.
    pub fn unload(&self, plugin_id: &str) {
        if let Some((_, slot)) = self.loaded.remove(plugin_id) {
            crate::lifecycle::unload(slot.loaded);
        }
    }

    /// Unloads then reloads from the plugin's existing install directory,
    /// picking up a rebuilt dylib without requiring a full reinstall.
    pub fn reload(&self, plugin_id: &str) -> Result<PluginRecord, LoaderError> {
        let install_dir = self.tools_root.join(plugin_id).join("current");
        self.load_from_dir(plugin_id, &install_dir)
    }

    pub fn get(&self, plugin_id: &str) -> Option<PluginRecord> {
        self.loaded.get(plugin_id).map(|r| Self::record(r.value()))
    }

    pub fn list(&self) -> Vec<PluginRecord> {
        self.loaded.iter().map(|r| Self::record(r.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Runs `f` with the loaded plugin's raw ABI handle, for the dispatcher
    /// to invoke `invoke`/`handle_route` without the registry exposing raw
    /// pointers to other crates.
    pub fn with_loaded<R>(
        &self,
        plugin_id: &str,
        f: impl FnOnce(&crate::loader::LoadedPlugin) -> R,
    ) -> Option<R> {
        self.loaded.get(plugin_id).map(|r| f(&r.value().loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osrt_identity::InMemorySecretStore;

    fn test_registry() -> (PluginRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::new(
            dir.path().join("tools"),
            dir.path().join("data"),
            Arc::new(InMemorySecretStore::new()),
        );
        (registry, dir)
    }

    #[test]
    fn empty_registry_has_no_plugins() {
        let (registry, _dir) = test_registry();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn load_from_dir_with_no_library_fails_fast() {
        let (registry, dir) = test_registry();
        let empty_dir = dir.path().join("empty");
        std::fs::create_dir_all(&empty_dir).unwrap();
        let err = registry.load_from_dir("com.example.nothing", &empty_dir).unwrap_err();
        assert!(matches!(err, LoaderError::AmbiguousLibrary(0)));
    }

    #[test]
    fn uninstall_of_never_loaded_plugin_is_a_no_op() {
        let (registry, _dir) = test_registry();
        assert!(registry.uninstall("com.example.never-existed").is_ok());
    }
}
