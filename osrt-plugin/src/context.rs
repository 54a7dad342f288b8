//! Per-plugin host context and the thread-local "active plugin" dispatch
//! that lets the ABI trampolines find it without an explicit parameter.

use dashmap::DashMap;
use osrt_db::PluginDatabase;
use osrt_identity::SecretStore;
use std::cell::RefCell;
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, OnceLock};

/// Everything a loaded plugin's callbacks need: its sandboxed database and
/// its slice of the secret store, scoped by plugin id.
pub struct PluginHostContext {
    pub plugin_id: String,
    pub db: PluginDatabase,
    pub secrets: Arc<dyn SecretStore>,
}

impl PluginHostContext {
    pub fn new(plugin_id: String, db: PluginDatabase, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            plugin_id,
            db,
            secrets,
        }
    }

    fn secret_account(&self) -> String {
        format!("config:{}", self.plugin_id)
    }

    fn config_get(&self, key: &str) -> Option<String> {
        let account = self.secret_account();
        let raw = self.secrets.read("com.osaurus.plugin-config", &account).ok()??;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&raw).ok()?;
        map.get(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    fn config_set(&self, key: &str, value: &str) {
        let account = self.secret_account();
        let mut map = self
            .secrets
            .read("com.osaurus.plugin-config", &account)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&raw).ok())
            .unwrap_or_default();
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        if let Ok(bytes) = serde_json::to_vec(&map) {
            let _ = self.secrets.write("com.osaurus.plugin-config", &account, &bytes);
        }
    }

    fn config_delete(&self, key: &str) {
        let account = self.secret_account();
        let Some(raw) = self.secrets.read("com.osaurus.plugin-config", &account).ok().flatten() else {
            return;
        };
        let Ok(mut map) = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&raw) else {
            return;
        };
        map.remove(key);
        if let Ok(bytes) = serde_json::to_vec(&map) {
            let _ = self.secrets.write("com.osaurus.plugin-config", &account, &bytes);
        }
    }

    /// Builds the `_secrets` payload-injection map for an `invoke` call from
    /// the plugin's manifest-declared secret names. Returns `None` when none
    /// of `secret_keys` has a configured value, so the reserved key is
    /// omitted entirely rather than injected as an empty object.
    pub fn configured_secrets(&self, secret_keys: &[String]) -> Option<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for key in secret_keys {
            if let Some(value) = self.config_get(key) {
                map.insert(key.clone(), serde_json::Value::String(value));
            }
        }
        if map.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(map))
        }
    }
}

/// Registry of host contexts by plugin id, consulted by the trampolines
/// through the active-plugin thread-local. Populated by the loader on
/// load, removed by `unload`.
static HOST_CONTEXTS: OnceLock<DashMap<String, Arc<PluginHostContext>>> = OnceLock::new();

fn host_contexts() -> &'static DashMap<String, Arc<PluginHostContext>> {
    HOST_CONTEXTS.get_or_init(DashMap::new)
}

pub fn register_host_context(ctx: Arc<PluginHostContext>) {
    host_contexts().insert(ctx.plugin_id.clone(), ctx);
}

pub fn unregister_host_context(plugin_id: &str) -> Option<Arc<PluginHostContext>> {
    host_contexts().remove(plugin_id).map(|(_, v)| v)
}

/// Looks up a plugin's host context by id directly, for callers (the
/// dispatcher's `invoke` path) that need it outside of the thread-local
/// active-plugin scope used by the ABI trampolines.
pub fn get_host_context(plugin_id: &str) -> Option<Arc<PluginHostContext>> {
    host_contexts().get(plugin_id).map(|r| Arc::clone(r.value()))
}

thread_local! {
    static ACTIVE_PLUGIN: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the active-plugin thread-local for the duration of `f`, then clears
/// it unconditionally (even on panic-unwind through `f`, via the guard's
/// `Drop`). Every call site that enters native plugin code must wrap the
/// call with this.
pub fn with_active_plugin<F, R>(plugin_id: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    struct ClearOnDrop;
    impl Drop for ClearOnDrop {
        fn drop(&mut self) {
            ACTIVE_PLUGIN.with(|cell| *cell.borrow_mut() = None);
        }
    }

    ACTIVE_PLUGIN.with(|cell| *cell.borrow_mut() = Some(plugin_id.to_string()));
    let _guard = ClearOnDrop;
    f()
}

fn active_context() -> Option<Arc<PluginHostContext>> {
    let id = ACTIVE_PLUGIN.with(|cell| cell.borrow().clone())?;
    host_contexts().get(&id).map(|r| Arc::clone(r.value()))
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Allocates a C string on the platform heap, matching the ABI contract
/// that plugin-owned strings coming from the host are freed with `free`.
fn to_malloc_cstring(s: &str) -> *mut c_char {
    let len = s.len() + 1;
    unsafe {
        let buf = libc::malloc(len) as *mut c_char;
        if buf.is_null() {
            return std::ptr::null_mut();
        }
        std::ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, buf, s.len());
        *buf.add(s.len()) = 0;
        buf
    }
}

/// # Safety
/// Must only be called by a plugin on a thread for which
/// `with_active_plugin` is currently in scope.
pub unsafe extern "C" fn trampoline_config_get(key: *const c_char) -> *mut c_char {
    let Some(ctx) = active_context() else {
        return std::ptr::null_mut();
    };
    let Some(key) = cstr_to_string(key) else {
        return std::ptr::null_mut();
    };
    match ctx.config_get(&key) {
        Some(value) => to_malloc_cstring(&value),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
/// Same contract as `trampoline_config_get`.
pub unsafe extern "C" fn trampoline_config_set(key: *const c_char, value: *const c_char) {
    let Some(ctx) = active_context() else { return };
    let (Some(key), Some(value)) = (cstr_to_string(key), cstr_to_string(value)) else {
        return;
    };
    ctx.config_set(&key, &value);
}

/// # Safety
/// Same contract as `trampoline_config_get`.
pub unsafe extern "C" fn trampoline_config_delete(key: *const c_char) {
    let Some(ctx) = active_context() else { return };
    let Some(key) = cstr_to_string(key) else { return };
    ctx.config_delete(&key);
}

/// # Safety
/// Same contract as `trampoline_config_get`.
pub unsafe extern "C" fn trampoline_db_exec(
    sql: *const c_char,
    params_json: *const c_char,
) -> *mut c_char {
    let Some(ctx) = active_context() else {
        return std::ptr::null_mut();
    };
    let Some(sql) = cstr_to_string(sql) else {
        return std::ptr::null_mut();
    };
    let params = cstr_to_string(params_json).and_then(|s| serde_json::from_str(&s).ok());
    let result = ctx.db.exec(&sql, params.as_ref());
    to_malloc_cstring(&result.to_string())
}

/// # Safety
/// Same contract as `trampoline_config_get`.
pub unsafe extern "C" fn trampoline_db_query(
    sql: *const c_char,
    params_json: *const c_char,
) -> *mut c_char {
    let Some(ctx) = active_context() else {
        return std::ptr::null_mut();
    };
    let Some(sql) = cstr_to_string(sql) else {
        return std::ptr::null_mut();
    };
    let params = cstr_to_string(params_json).and_then(|s| serde_json::from_str(&s).ok());
    let result = ctx.db.query(&sql, params.as_ref());
    to_malloc_cstring(&result.to_string())
}

/// # Safety
/// Same contract as `trampoline_config_get`.
pub unsafe extern "C" fn trampoline_log(level: c_int, message: *const c_char) {
    let Some(ctx) = active_context() else { return };
    let Some(message) = cstr_to_string(message) else {
        return;
    };
    osrt_observability::plugin_log_sink::emit(&ctx.plugin_id, level, &message);
}
