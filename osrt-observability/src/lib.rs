pub mod access_log;
pub mod plugin_log_sink;
pub mod tracing_init;

pub use access_log::AccessLogEntry;
pub use tracing_init::init_tracing;
