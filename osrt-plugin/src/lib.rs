pub mod abi;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod package;
pub mod registry;

pub use context::{with_active_plugin, PluginHostContext};
pub use error::LoaderError;
pub use loader::{find_single_library, load_plugin, LoadedPlugin};
pub use registry::{PluginRecord, PluginRegistry};
