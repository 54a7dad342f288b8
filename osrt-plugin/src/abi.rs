//! The stable C ABI boundary between the host and a plugin dynamic library.
//!
//! Mirrors a C header: `osr_host_api` is the table the host hands to a v2
//! plugin at load time; `osr_plugin_api` is the table the plugin hands back.
//! Every function pointer here crosses a foreign-language boundary — keep
//! the layout `repr(C)` and never reorder fields without a version bump.

use std::os::raw::{c_char, c_int, c_void};

/// Log levels accepted by `osr_host_api.log`.
pub const LOG_LEVEL_DEBUG: c_int = 0;
pub const LOG_LEVEL_INFO: c_int = 1;
pub const LOG_LEVEL_WARN: c_int = 2;
pub const LOG_LEVEL_ERROR: c_int = 3;

/// Opaque plugin context. The host never inspects its contents; it is
/// created by `init` and threaded back unchanged into every later call.
pub type PluginContextPtr = *mut c_void;

/// Host-side services exposed to a v2 plugin. None of these take a
/// plugin-id argument: the trampoline implementations look up the
/// currently active plugin on the calling thread (see `context.rs`),
/// because a plugin may call back from a thread it spawned itself.
///
/// Strings returned to the plugin (`config_get`) are allocated with the
/// platform `malloc`; the plugin frees them with `free`. Strings the
/// plugin passes in are borrowed for the duration of the call only.
#[repr(C)]
pub struct OsrHostApi {
    pub version: u32,
    pub config_get: unsafe extern "C" fn(key: *const c_char) -> *mut c_char,
    pub config_set: unsafe extern "C" fn(key: *const c_char, value: *const c_char),
    pub config_delete: unsafe extern "C" fn(key: *const c_char),
    pub db_exec:
        unsafe extern "C" fn(sql: *const c_char, params_json: *const c_char) -> *mut c_char,
    pub db_query:
        unsafe extern "C" fn(sql: *const c_char, params_json: *const c_char) -> *mut c_char,
    pub log: unsafe extern "C" fn(level: c_int, message: *const c_char),
}

/// Plugin-side services. Strings returned from the plugin (`get_manifest`,
/// `invoke`, `handle_route`) are freed by the host through `free_string`,
/// never through the host's own allocator directly.
#[repr(C)]
pub struct OsrPluginApi {
    pub free_string: unsafe extern "C" fn(s: *mut c_char),
    pub init: unsafe extern "C" fn() -> PluginContextPtr,
    pub destroy: unsafe extern "C" fn(ctx: PluginContextPtr),
    pub get_manifest: unsafe extern "C" fn(ctx: PluginContextPtr) -> *mut c_char,
    pub invoke: unsafe extern "C" fn(
        ctx: PluginContextPtr,
        kind: *const c_char,
        id: *const c_char,
        payload_json: *const c_char,
    ) -> *mut c_char,
    /// Absent on a v1 entry point; treated as version 1.
    pub version: u32,
    pub handle_route:
        unsafe extern "C" fn(ctx: PluginContextPtr, request_json: *const c_char) -> *mut c_char,
    pub on_config_changed:
        unsafe extern "C" fn(ctx: PluginContextPtr, key: *const c_char, value: *const c_char),
}

/// `const osr_plugin_api* osaurus_plugin_entry(void);`
pub type EntryFnV1 = unsafe extern "C" fn() -> *const OsrPluginApi;

/// `const osr_plugin_api* osaurus_plugin_entry_v2(const osr_host_api* host);`
pub type EntryFnV2 = unsafe extern "C" fn(host: *const OsrHostApi) -> *const OsrPluginApi;

pub const ENTRY_SYMBOL_V1: &[u8] = b"osaurus_plugin_entry\0";
pub const ENTRY_SYMBOL_V2: &[u8] = b"osaurus_plugin_entry_v2\0";
