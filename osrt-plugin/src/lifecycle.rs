//! Plugin teardown: `on_config_changed` must never fire once unload has
//! begun, outstanding `invoke`/`handle_route` calls must drain first, then
//! `destroy`, then the host context (and its database) is released, then
//! the library is closed.

use crate::context::{unregister_host_context, with_active_plugin};
use crate::loader::LoadedPlugin;

/// Consumes the `LoadedPlugin`, running its teardown sequence. The caller
/// is responsible for having already drained any in-flight dispatch work
/// for this plugin id — this function does not wait on a work queue itself,
/// since `osrt-plugin` has no opinion on how the queue is scheduled.
pub fn unload(plugin: LoadedPlugin) {
    let plugin_id = plugin.plugin_id.clone();
    unsafe {
        with_active_plugin(&plugin_id, || {
            ((*plugin.api()).destroy)(plugin.ctx());
        });
    }
    unregister_host_context(&plugin_id);
    tracing::info!(plugin = %plugin_id, "plugin unloaded");
    // `plugin` drops here: `_library` is the last referent of `api`/`ctx`
    // and unmaps only now that both have been retired.
}

#[cfg(test)]
mod tests {
    // `unload` requires a real dynamic library with a working entry point
    // to exercise end-to-end; covered by the registry's integration tests
    // once a fixture plugin is available. `find_single_library` and the
    // open-failure path are covered in `loader.rs`.
}
