//! Submits `invoke`/`handle_route` calls to a single dedicated work queue
//! shared by every loaded plugin, so a cooperative task suspends only at
//! the boundary into native code — once a job is picked up, the queue
//! thread runs it to completion before taking the next one.

use crate::error::DispatchError;
use osrt_plugin::{with_active_plugin, PluginRegistry};
use std::ffi::CString;
use std::os::raw::c_char;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send>;

/// Carries a `*const PluginRegistry` across the channel into the dispatch
/// thread. The pointer itself has no `Send` impl; this wrapper asserts the
/// one invariant that makes sending it sound here: the caller holds the
/// registry for the dispatcher's entire lifetime (it's process-wide), so the
/// pointee outlives every job that might dereference it.
struct RegistryPtr(*const PluginRegistry);

unsafe impl Send for RegistryPtr {}

/// Owns the dedicated OS thread that every native plugin call runs on.
/// One `Dispatcher` is shared by the whole host; plugins never get a queue
/// each, which is what keeps the thread count bounded regardless of how
/// many plugins are loaded.
pub struct Dispatcher {
    job_tx: crossbeam_channel::Sender<Job>,
    _worker: std::thread::JoinHandle<()>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let worker = std::thread::Builder::new()
            .name("osrt-dispatch".to_string())
            .spawn(move || {
                for job in job_rx {
                    job();
                }
            })
            .expect("failed to spawn dispatch worker thread");
        Self {
            job_tx,
            _worker: worker,
        }
    }

    /// Invokes `registry`'s `handle_route` for `plugin_id` with `request_json`,
    /// waiting up to `timeout` for a reply. A timeout resolves the caller
    /// with an error but does not interrupt the native call already running
    /// on the dispatch thread — it is left to complete and its result is
    /// discarded.
    pub async fn handle_route(
        &self,
        registry: &PluginRegistry,
        plugin_id: &str,
        request_json: &str,
        timeout: Duration,
    ) -> Result<String, DispatchError> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let plugin_id_owned = plugin_id.to_string();
        let request_json_owned = request_json.to_string();

        let registry_ptr = RegistryPtr(registry as *const PluginRegistry);

        let job: Job = Box::new(move || {
            let registry_ptr = registry_ptr;
            let registry = unsafe { &*registry_ptr.0 };
            let result = registry.with_loaded(&plugin_id_owned, |loaded| {
                call_handle_route(&plugin_id_owned, loaded, &request_json_owned)
            });
            let _ = reply_tx.send(result.unwrap_or(Err(DispatchError::RouteHandlerNotAvailable)));
        });

        self.job_tx
            .send(job)
            .map_err(|_| DispatchError::RouteHandlerNotAvailable)?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DispatchError::RouteHandlerNotAvailable),
            Err(_) => Err(DispatchError::Timeout),
        }
    }

    /// Invokes `registry`'s `invoke` entry point for one of `plugin_id`'s
    /// tools. `payload` is augmented with `_secrets` (looked up from the
    /// plugin's own config store, scoped to its manifest-declared secret
    /// names) and `_context` before it crosses the ABI — see
    /// `crate::invoke::augment_payload`.
    #[allow(clippy::too_many_arguments)]
    pub async fn invoke_tool(
        &self,
        registry: &PluginRegistry,
        plugin_id: &str,
        kind: &str,
        tool_id: &str,
        payload: serde_json::Value,
        working_directory: Option<&str>,
        timeout: Duration,
    ) -> Result<String, DispatchError> {
        let secret_keys = registry
            .with_loaded(plugin_id, |loaded| loaded.manifest.secrets.clone())
            .unwrap_or_default();
        let secrets = osrt_plugin::context::get_host_context(plugin_id)
            .and_then(|ctx| ctx.configured_secrets(&secret_keys));
        let augmented = crate::invoke::augment_payload(payload, secrets, working_directory);

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let plugin_id_owned = plugin_id.to_string();
        let kind_owned = kind.to_string();
        let tool_id_owned = tool_id.to_string();
        let payload_json = augmented.to_string();
        let registry_ptr = RegistryPtr(registry as *const PluginRegistry);

        let job: Job = Box::new(move || {
            let registry_ptr = registry_ptr;
            let registry = unsafe { &*registry_ptr.0 };
            let result = registry.with_loaded(&plugin_id_owned, |loaded| {
                call_invoke(&plugin_id_owned, loaded, &kind_owned, &tool_id_owned, &payload_json)
            });
            let _ = reply_tx.send(result.unwrap_or(Err(DispatchError::RouteHandlerNotAvailable)));
        });

        self.job_tx
            .send(job)
            .map_err(|_| DispatchError::RouteHandlerNotAvailable)?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DispatchError::RouteHandlerNotAvailable),
            Err(_) => Err(DispatchError::Timeout),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn call_handle_route(
    plugin_id: &str,
    loaded: &osrt_plugin::LoadedPlugin,
    request_json: &str,
) -> Result<String, DispatchError> {
    let Ok(request_cstring) = CString::new(request_json) else {
        return Err(DispatchError::RouteHandlerNotAvailable);
    };

    let raw = with_active_plugin(plugin_id, || unsafe {
        let api = &*loaded.api();
        (api.handle_route)(loaded.ctx(), request_cstring.as_ptr() as *const c_char)
    });

    if raw.is_null() {
        return Err(DispatchError::PluginReturnedNull);
    }

    let text = unsafe { std::ffi::CStr::from_ptr(raw).to_string_lossy().into_owned() };
    unsafe {
        let api = &*loaded.api();
        (api.free_string)(raw);
    }
    Ok(text)
}

fn call_invoke(
    plugin_id: &str,
    loaded: &osrt_plugin::LoadedPlugin,
    kind: &str,
    tool_id: &str,
    payload_json: &str,
) -> Result<String, DispatchError> {
    let (Ok(kind_cstring), Ok(id_cstring), Ok(payload_cstring)) = (
        CString::new(kind),
        CString::new(tool_id),
        CString::new(payload_json),
    ) else {
        return Err(DispatchError::RouteHandlerNotAvailable);
    };

    let raw = with_active_plugin(plugin_id, || unsafe {
        let api = &*loaded.api();
        (api.invoke)(
            loaded.ctx(),
            kind_cstring.as_ptr() as *const c_char,
            id_cstring.as_ptr() as *const c_char,
            payload_cstring.as_ptr() as *const c_char,
        )
    });

    if raw.is_null() {
        return Err(DispatchError::PluginReturnedNull);
    }

    let text = unsafe { std::ffi::CStr::from_ptr(raw).to_string_lossy().into_owned() };
    unsafe {
        let api = &*loaded.api();
        (api.free_string)(raw);
    }
    Ok(text)
}
