use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the osaurus runtime host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Where installed plugin packages live: `<tools_root>/<plugin_id>/<version>/`.
    #[serde(default = "default_tools_root")]
    pub tools_root: PathBuf,

    /// Where per-plugin SQLite databases and secret-store files live.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace"|"debug"|"info"|"warn"|"error", parsed by tracing-subscriber's
    /// EnvFilter.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    #[serde(default = "default_bucket_max")]
    pub max_tokens: f64,
    /// Tokens refilled per second.
    #[serde(default = "default_refill_rate")]
    pub refill_per_second: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_bucket_max(),
            refill_per_second: default_refill_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long the dispatcher waits for a plugin's `invoke`/`handle_route`
    /// call to complete before resolving the caller with a timeout error.
    /// The underlying native call is left to run to completion regardless.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dispatch_timeout_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from YAML file + environment variables.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        } else {
            for default_path in &["osaurus.yaml", "/etc/osaurus/osaurus.yaml", "config/osaurus.yaml"] {
                if std::path::Path::new(default_path).exists() {
                    figment = figment.merge(Yaml::file(default_path));
                    break;
                }
            }
        }

        // Environment overrides: OSAURUS_LOGGING__LEVEL, OSAURUS_TOOLS_ROOT, etc.
        figment = figment.merge(Env::prefixed("OSAURUS_").split("__"));

        let config: Self = figment.extract()?;
        Ok(config)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tools_root: default_tools_root(),
            data_root: default_data_root(),
            logging: LoggingConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

fn default_tools_root() -> PathBuf {
    PathBuf::from("./osaurus-data/Tools")
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./osaurus-data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_bucket_max() -> f64 {
    100.0
}

fn default_refill_rate() -> f64 {
    100.0 / 60.0
}

fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = RuntimeConfig::default();
        assert_eq!(config.rate_limiter.max_tokens, 100.0);
        assert!((config.rate_limiter.refill_per_second - 100.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn load_with_missing_file_falls_back_to_defaults() {
        let config = RuntimeConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
