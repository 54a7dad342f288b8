use serde::{Deserialize, Serialize};

/// Authorization tier for a plugin-declared route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAuth {
    /// No bearer key required; subject to the rate limiter.
    None,
    /// Bearer key required, validated against the effective whitelist;
    /// subject to the rate limiter.
    Verify,
    /// Bearer key required; bypasses the rate limiter entirely.
    Owner,
}

impl Default for RouteAuth {
    fn default() -> Self {
        RouteAuth::Owner
    }
}

/// One HTTP route a plugin wants the host to dispatch to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub id: String,
    /// e.g. `/callback` or `/app/*` — a single trailing wildcard segment.
    pub path: String,
    /// Compared case-insensitively against the incoming request method.
    pub methods: Vec<String>,
    #[serde(default)]
    pub auth: RouteAuth,
    #[serde(default)]
    pub description: Option<String>,
}

/// Permission tier a plugin requests for one of its tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    Ask,
    Auto,
    Deny,
}

/// One invokable tool a plugin exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: String,
    pub description: String,
    /// JSON-Schema value describing the tool's call arguments.
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub permission_policy: PermissionPolicy,
}

/// Capability groups a plugin declares in its manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginCapabilities {
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub config: Vec<String>,
    #[serde(default)]
    pub web: bool,
}

/// Manifest a plugin returns from `get_manifest` on first demand after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub plugin_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub min_host_version: Option<String>,
    #[serde(default)]
    pub capabilities: PluginCapabilities,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub docs: Option<String>,
}
