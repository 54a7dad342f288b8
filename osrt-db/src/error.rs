use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database is not open")]
    NotOpen,

    #[error("failed to open database: {0}")]
    OpenFailed(String),

    #[error("failed to prepare statement: {0}")]
    PrepareFailed(String),

    #[error("statement execution failed: {0}")]
    ExecFailed(String),

    #[error("statement forbidden: {0}")]
    Forbidden(String),
}

impl DbError {
    /// Every database failure surfaces to the plugin as a JSON object with
    /// a single `error` key — never a host crash.
    pub fn to_json_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
