//! Dynamic-library open, entry-point discovery, and the v2/v1 handshake
//! described by the loading sequence in the plugin ABI.

use crate::abi::{
    EntryFnV1, EntryFnV2, OsrHostApi, OsrPluginApi, ENTRY_SYMBOL_V1, ENTRY_SYMBOL_V2,
};
use crate::context::{
    register_host_context, trampoline_config_delete, trampoline_config_get, trampoline_config_set,
    trampoline_db_exec, trampoline_db_query, trampoline_log, with_active_plugin, PluginHostContext,
};
use crate::error::LoaderError;
use libloading::Library;
use osrt_core::PluginManifest;
use osrt_db::PluginDatabase;
use osrt_identity::SecretStore;
use std::path::Path;
use std::sync::Arc;

/// A plugin's dynamic library, function table, and opaque context, owned
/// exclusively by the registry that loaded it. Released only through
/// `crate::lifecycle::unload`.
pub struct LoadedPlugin {
    pub plugin_id: String,
    pub manifest: PluginManifest,
    pub abi_version: u32,
    pub install_path: std::path::PathBuf,
    api: *const OsrPluginApi,
    ctx: *mut std::os::raw::c_void,
    // Keeps the dylib mapped for the plugin's entire lifetime; must outlive
    // `api` and `ctx`, both of which point into or were produced by it.
    _library: Library,
}

// SAFETY: a LoadedPlugin is handed to exactly one registry, which
// serialises all native entry through the dispatcher's work queue (or, in
// this crate's test suite, through a single call path). The raw pointers
// are only ever dereferenced with the active-plugin thread-local set.
unsafe impl Send for LoadedPlugin {}
unsafe impl Sync for LoadedPlugin {}

fn host_api_table() -> OsrHostApi {
    OsrHostApi {
        version: 1,
        config_get: trampoline_config_get,
        config_set: trampoline_config_set,
        config_delete: trampoline_config_delete,
        db_exec: trampoline_db_exec,
        db_query: trampoline_db_query,
        log: trampoline_log,
    }
}

/// Runs the full load sequence against the single dynamic library found at
/// `library_path`, for a plugin whose install directory is named
/// `plugin_id`.
pub fn load_plugin(
    plugin_id: &str,
    library_path: &Path,
    data_root: &Path,
    secrets: Arc<dyn SecretStore>,
) -> Result<LoadedPlugin, LoaderError> {
    // Step 1: open the library, propagating the platform error unmodified.
    let library = unsafe {
        Library::new(library_path).map_err(|e| LoaderError::OpenLibraryFailed(e.to_string()))?
    };

    // Step 3: build the per-plugin host context before the entry point runs,
    // so callbacks made from inside the entry function itself (and not just
    // from init()) have somewhere to land.
    let db = PluginDatabase::open(plugin_id, data_root)
        .map_err(|e| LoaderError::OpenLibraryFailed(e.to_string()))?;
    let host_ctx = Arc::new(PluginHostContext::new(plugin_id.to_string(), db, secrets));
    register_host_context(Arc::clone(&host_ctx));

    // Step 2+4+5: v2 preferred, v1 fallback. The host table passed to v2
    // must outlive the plugin, so it's leaked deliberately for the
    // process's lifetime rather than dropped at the end of this function.
    let host_api: &'static OsrHostApi = Box::leak(Box::new(host_api_table()));

    let (api_ptr, abi_version) = unsafe {
        if let Ok(entry_v2) = library.get::<EntryFnV2>(ENTRY_SYMBOL_V2) {
            let entry_v2: EntryFnV2 = *entry_v2;
            let api = with_active_plugin(plugin_id, || entry_v2(host_api as *const OsrHostApi));
            if api.is_null() {
                crate::context::unregister_host_context(plugin_id);
                return Err(LoaderError::EntryReturnedNull);
            }
            let version = (*api).version;
            (api, if version == 0 { 1 } else { version })
        } else if let Ok(entry_v1) = library.get::<EntryFnV1>(ENTRY_SYMBOL_V1) {
            let entry_v1: EntryFnV1 = *entry_v1;
            let api = with_active_plugin(plugin_id, entry_v1);
            if api.is_null() {
                crate::context::unregister_host_context(plugin_id);
                return Err(LoaderError::EntryReturnedNull);
            }
            (api, 1)
        } else {
            crate::context::unregister_host_context(plugin_id);
            return Err(LoaderError::MissingEntryPoint);
        }
    };

    // Step 6: init().
    let ctx = unsafe { with_active_plugin(plugin_id, || ((*api_ptr).init)()) };
    if ctx.is_null() {
        crate::context::unregister_host_context(plugin_id);
        return Err(LoaderError::InitFailed);
    }

    // Step 7: get_manifest(ctx), copy out, free the plugin's buffer.
    let manifest_json = unsafe {
        with_active_plugin(plugin_id, || {
            let raw = ((*api_ptr).get_manifest)(ctx);
            if raw.is_null() {
                return None;
            }
            let text = std::ffi::CStr::from_ptr(raw).to_string_lossy().into_owned();
            ((*api_ptr).free_string)(raw);
            Some(text)
        })
    };
    let Some(manifest_json) = manifest_json else {
        unsafe { with_active_plugin(plugin_id, || ((*api_ptr).destroy)(ctx)) };
        crate::context::unregister_host_context(plugin_id);
        return Err(LoaderError::ManifestFailed("get_manifest returned null".into()));
    };

    let manifest: PluginManifest = match serde_json::from_str(&manifest_json) {
        Ok(manifest) => manifest,
        Err(e) => {
            unsafe { with_active_plugin(plugin_id, || ((*api_ptr).destroy)(ctx)) };
            crate::context::unregister_host_context(plugin_id);
            return Err(LoaderError::ManifestFailed(e.to_string()));
        }
    };

    // Step 8: the manifest's own claimed id must agree with the directory.
    if manifest.plugin_id != plugin_id {
        unsafe { with_active_plugin(plugin_id, || ((*api_ptr).destroy)(ctx)) };
        crate::context::unregister_host_context(plugin_id);
        return Err(LoaderError::ManifestMismatch {
            manifest_id: manifest.plugin_id,
            dir_id: plugin_id.to_string(),
        });
    }

    Ok(LoadedPlugin {
        plugin_id: plugin_id.to_string(),
        manifest,
        abi_version,
        install_path: library_path.to_path_buf(),
        api: api_ptr,
        ctx,
        _library: library,
    })
}

impl LoadedPlugin {
    pub fn api(&self) -> *const OsrPluginApi {
        self.api
    }

    pub fn ctx(&self) -> *mut std::os::raw::c_void {
        self.ctx
    }
}

/// A plugin package's install directory must contain exactly one dynamic
/// library. Per the open question on multiple libraries per plugin: fail
/// fast rather than guessing which one the plugin author meant.
pub fn find_single_library(install_dir: &Path) -> Result<std::path::PathBuf, LoaderError> {
    let ext = std::env::consts::DLL_EXTENSION;
    let mut found = Vec::new();
    for entry in std::fs::read_dir(install_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            found.push(path);
        }
    }
    match found.len() {
        1 => Ok(found.into_iter().next().unwrap()),
        n => Err(LoaderError::AmbiguousLibrary(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_single_library_rejects_zero_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_single_library(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::AmbiguousLibrary(0)));
    }

    #[test]
    fn find_single_library_rejects_multiple_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        std::fs::write(dir.path().join(format!("a.{ext}")), b"").unwrap();
        std::fs::write(dir.path().join(format!("b.{ext}")), b"").unwrap();
        let err = find_single_library(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::AmbiguousLibrary(2)));
    }

    #[test]
    fn find_single_library_accepts_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        let path = dir.path().join(format!("only.{ext}"));
        std::fs::write(&path, b"").unwrap();
        assert_eq!(find_single_library(dir.path()).unwrap(), path);
    }

    #[test]
    fn opening_a_non_library_file_reports_the_platform_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not-a-library.so");
        std::fs::write(&bogus, b"not an elf file").unwrap();
        let store: Arc<dyn SecretStore> = Arc::new(osrt_identity::InMemorySecretStore::new());
        let err = load_plugin("com.example.bogus", &bogus, dir.path(), store).unwrap_err();
        assert!(matches!(err, LoaderError::OpenLibraryFailed(_)));
    }
}
