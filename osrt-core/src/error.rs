use thiserror::Error;

/// Unified error type for the host binary's own surface (config, plugin
/// directory scanning). Per-subsystem crates carry their own error enums;
/// this one exists for glue code in `osrt-host` and `osrt-core` itself.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("rate limited")]
    RateLimited,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Map to an HTTP status code for surfaces that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            RuntimeError::RateLimited => 429,
            RuntimeError::Config(_) => 500,
            RuntimeError::Plugin(_) => 500,
            RuntimeError::Io(_) => 500,
            RuntimeError::Serde(_) => 500,
            RuntimeError::Internal(_) => 500,
        }
    }

    /// `{"error": "...", "status": n}` envelope for surfaces that report a
    /// status alongside the message.
    pub fn to_json_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string(), "status": self.status_code() })
    }
}
