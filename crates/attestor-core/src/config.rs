use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{DEFAULT_ENGINE, IGNORE_FILE};
use crate::error::{FingerprintError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttestorConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

impl AttestorConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FingerprintError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            FingerprintError::Config(msg) => {
                FingerprintError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str::<Self>(text)
            .map_err(|e| FingerprintError::Config(format!("failed to parse TOML config: {e}")))
    }

    /// Loads `path` when it exists; an absent file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("config file {} absent, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RegistryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine")]
    pub binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            ignore_file: default_ignore_file(),
            parallel: default_parallel(),
        }
    }
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_ignore_file() -> String {
    IGNORE_FILE.to_string()
}

fn default_parallel() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AttestorConfig::from_toml("").expect("empty config should parse");
        assert_eq!(cfg.registry.retries, 3);
        assert_eq!(cfg.registry.backoff(), Duration::from_millis(500));
        assert_eq!(cfg.engine.binary, "docker");
        assert_eq!(cfg.tree.ignore_file, ".attestor_ignore");
        assert!(cfg.tree.parallel);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = AttestorConfig::from_toml(
            r#"
            [registry]
            retries = 0

            [engine]
            binary = "podman"
            "#,
        )
        .expect("fixture config should parse");
        assert_eq!(cfg.registry.retries, 0);
        assert_eq!(cfg.registry.timeout_secs, 30);
        assert_eq!(cfg.engine.binary, "podman");
    }

    #[test]
    fn malformed_config_is_config_error() {
        let err = AttestorConfig::from_toml("[registry]\nretries = \"many\"").expect_err("must fail");
        assert!(matches!(err, FingerprintError::Config(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AttestorConfig::load_or_default(&dir.path().join("attestor.toml")).unwrap();
        assert_eq!(cfg.registry.retries, 3);

        let err = AttestorConfig::load_from_file(&dir.path().join("attestor.toml"))
            .expect_err("explicit missing file must fail");
        assert!(err.to_string().contains("attestor.toml"));
    }
}
