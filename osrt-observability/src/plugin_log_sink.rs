//! Maps a plugin's `log(level, message)` host-API call onto the host's own
//! tracing spans, tagged with the calling plugin's id.

pub const LOG_LEVEL_DEBUG: i32 = 0;
pub const LOG_LEVEL_INFO: i32 = 1;
pub const LOG_LEVEL_WARN: i32 = 2;
pub const LOG_LEVEL_ERROR: i32 = 3;

/// Emits one plugin log line at the host's tracing level corresponding to
/// `level`. Unrecognised levels are treated as `info` rather than dropped,
/// so a plugin author's logging is never silently lost.
pub fn emit(plugin_id: &str, level: i32, message: &str) {
    match level {
        LOG_LEVEL_DEBUG => tracing::debug!(plugin = plugin_id, "{message}"),
        LOG_LEVEL_WARN => tracing::warn!(plugin = plugin_id, "{message}"),
        LOG_LEVEL_ERROR => tracing::error!(plugin = plugin_id, "{message}"),
        _ => tracing::info!(plugin = plugin_id, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_known_levels_emit_without_panicking() {
        emit("com.example.p", LOG_LEVEL_DEBUG, "debug line");
        emit("com.example.p", LOG_LEVEL_INFO, "info line");
        emit("com.example.p", LOG_LEVEL_WARN, "warn line");
        emit("com.example.p", LOG_LEVEL_ERROR, "error line");
    }

    #[test]
    fn unknown_level_falls_back_to_info_without_panicking() {
        emit("com.example.p", 99, "unknown level");
    }
}
