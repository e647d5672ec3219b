mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./apkscout.toml",
        "~/.config/apkscout/config.toml",
        "/etc/apkscout/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    config.fetch.validate()?;

    if config.apk.timeout_secs == 0 {
        anyhow::bail!("apk.timeout_secs must be at least 1");
    }

    if config.apk.program.as_os_str().is_empty() {
        anyhow::bail!("apk.program cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Strategy;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.fetch.strategy, Strategy::StreamingQueue);
        assert_eq!(config.apk.program, Path::new("apk"));
        assert_eq!(config.apk.timeout_secs, 30);
        assert!(config.apk.elevate.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let file = write_config(
            r#"
[fetch]
strategy = "static-partition"
workers = 3
partition_core_ratio = 0.5
call_timeout_secs = 5

[apk]
program = "/sbin/apk"
elevate = "doas"
timeout_secs = 10
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.fetch.strategy, Strategy::StaticPartition);
        assert_eq!(config.fetch.workers, Some(3));
        assert_eq!(config.fetch.partition_core_ratio, 0.5);
        assert_eq!(config.fetch.call_timeout_secs, Some(5));
        assert_eq!(config.apk.program, Path::new("/sbin/apk"));
        assert_eq!(config.apk.elevate.as_deref(), Some("doas"));
        assert_eq!(config.apk.timeout_secs, 10);
    }

    #[test]
    fn rejects_zero_workers() {
        let file = write_config("[fetch]\nworkers = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("workers"), "unexpected error: {err:#}");
    }

    #[test]
    fn rejects_zero_apk_timeout() {
        let file = write_config("[apk]\ntimeout_secs = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_unknown_strategy() {
        let file = write_config("[fetch]\nstrategy = \"round-robin\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"), "unexpected error: {err:#}");
    }

    #[test]
    fn missing_file_is_error() {
        let err = load_config(Path::new("/nonexistent/apkscout.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"), "unexpected error: {err}");
    }

    #[test]
    fn warns_when_call_deadline_outlives_apk_timeout() {
        let mut config = Config::default();
        config.fetch.call_timeout_secs = Some(60);
        let warnings = config.warnings(4);
        assert!(warnings.iter().any(|w| w.contains("apk is killed first")));
    }
}
