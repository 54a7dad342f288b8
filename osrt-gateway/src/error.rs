use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no route handler available for this plugin")]
    RouteHandlerNotAvailable,

    #[error("plugin returned a null response")]
    PluginReturnedNull,

    #[error("dispatch timed out waiting for the plugin")]
    Timeout,

    #[error("rate limited")]
    RateLimited,
}

impl DispatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::RateLimited => 429,
            DispatchError::RouteHandlerNotAvailable => 404,
            DispatchError::PluginReturnedNull => 502,
            DispatchError::Timeout => 504,
        }
    }

    /// `{"error": "...", "status": n}` — every dispatch failure reaches the
    /// caller as a structured envelope, never a raw 500.
    pub fn to_json_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string(), "status": self.status_code() })
    }
}
