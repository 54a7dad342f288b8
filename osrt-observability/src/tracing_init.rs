use osrt_core::config::LoggingConfig;

/// Initialises the global tracing subscriber. `RUST_LOG`, when set, takes
/// precedence over `config.level` — matches the convention the rest of the
/// workspace's env-driven config already follows.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_is_the_default_format() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        };
        assert_eq!(config.format, "pretty");
    }
}
