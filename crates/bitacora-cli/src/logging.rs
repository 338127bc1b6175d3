use bitacora_core::config::{Config, LoggingConfig};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging settings for this run: the project's `logging` section, with the
/// command-line level taking precedence.
pub fn settings(root: &Path, flag: Option<&str>) -> LoggingConfig {
    let mut cfg = Config::load(root).map(|c| c.logging).unwrap_or_default();
    if let Some(level) = flag {
        cfg.level = level.to_string();
    }
    cfg
}

pub fn default_level(cfg: &LoggingConfig) -> LevelFilter {
    cfg.level.parse().unwrap_or(LevelFilter::WARN)
}

pub fn init(cfg: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level(cfg).into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::new("demo");
        config.logging.level = "info".to_string();
        config.save(dir.path()).unwrap();

        assert_eq!(settings(dir.path(), None).level, "info");
        assert_eq!(settings(dir.path(), Some("debug")).level, "debug");
    }

    #[test]
    fn unknown_level_falls_back_to_warn() {
        let cfg = LoggingConfig {
            level: "chatty".to_string(),
        };
        assert_eq!(default_level(&cfg), LevelFilter::WARN);
        let cfg = LoggingConfig {
            level: "trace".to_string(),
        };
        assert_eq!(default_level(&cfg), LevelFilter::TRACE);
    }

    #[test]
    fn uninitialized_root_uses_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(settings(dir.path(), None).level, "warn");
    }
}
