//! Engine configuration loading.
//!
//! Reads `config.toml` from an explicit path or from the Flowstep home
//! directory (`$FLOWSTEP_HOME`, falling back to `~/.flowstep`). A missing or
//! broken file never stops the CLI: it logs and falls back to defaults.

use std::path::{Path, PathBuf};

use flowstep_types::config::{EngineConfig, MIN_POLL_INTERVAL_SECS};

/// Resolve the Flowstep home directory.
pub fn resolve_home_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FLOWSTEP_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".flowstep");
    }
    PathBuf::from(".flowstep")
}

/// The config file to read: `explicit` if given, else `<home>/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => resolve_home_dir().join("config.toml"),
    }
}

/// Load the engine configuration from `config_path`.
///
/// Returns defaults when the file does not exist, cannot be read or fails to
/// parse.
pub async fn load_engine_config(config_path: &Path) -> EngineConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    let config = match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return EngineConfig::default();
        }
    };

    clamp_poll_interval(config)
}

fn clamp_poll_interval(mut config: EngineConfig) -> EngineConfig {
    if config.max_poll_interval_secs < MIN_POLL_INTERVAL_SECS {
        tracing::warn!(
            configured = config.max_poll_interval_secs,
            "max_poll_interval_secs below minimum, using {MIN_POLL_INTERVAL_SECS}"
        );
        config.max_poll_interval_secs = MIN_POLL_INTERVAL_SECS;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_engine_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn load_engine_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "max_poll_interval_secs = 120\n")
            .await
            .unwrap();

        let config = load_engine_config(&path).await;
        assert_eq!(config.max_poll_interval_secs, 120);
    }

    #[tokio::test]
    async fn load_engine_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(&path).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn load_engine_config_zero_interval_is_clamped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "max_poll_interval_secs = 0\n")
            .await
            .unwrap();

        let config = load_engine_config(&path).await;
        assert_eq!(config.max_poll_interval_secs, MIN_POLL_INTERVAL_SECS);
    }

    #[test]
    fn config_path_prefers_explicit() {
        let explicit = Path::new("/etc/flowstep/custom.toml");
        assert_eq!(config_path(Some(explicit)), explicit);
        assert!(config_path(None).ends_with("config.toml"));
    }
}
