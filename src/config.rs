//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file: the explicit path (`--config` / `IMPORTER_CONFIG_PATH`),
//!    otherwise `importer.toml` in the working directory if it exists
//! 3. environment variables, e.g. `IMPORTER_STORE__ROOT`,
//!    `IMPORTER_POLLER__INTERVAL_SECS`, `IMPORTER_RETRY__MAX_ATTEMPTS`
//! 4. explicit overrides set on [`ConfigBuilder`]
//!
//! A `.env` file is loaded into the environment first, if present.

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ImportError;
use crate::transport::directory::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

pub const CONFIG_PATH_ENV: &str = "IMPORTER_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "importer.toml";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreSettings,
    pub poller: PollerSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding `incoming`, `processing`, `completed` and `terminated`.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
}

impl Config {
    /// Load configuration from the default sources.
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn root(&self) -> crate::error::Result<&Path> {
        self.store
            .root
            .as_deref()
            .ok_or_else(|| ImportError::Config("store.root is not set".to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poller.interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(root) = &self.store.root {
            if root.as_os_str().is_empty() {
                return Err(ImportError::Config("store.root must not be empty".to_string()));
            }
        }
        if self.poller.interval_secs == 0 {
            return Err(ImportError::Config(
                "poller.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ImportError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

/// Builder for [`Config`] with explicit overrides.
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    interval_secs: Option<u64>,
    max_attempts: Option<u32>,
}

impl ConfigBuilder {
    /// Set the config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Set the store root (overrides file and env)
    pub fn root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    pub fn interval_secs(mut self, secs: Option<u64>) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn build(self) -> Result<Config> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let config_path = self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let file_source = match &config_path {
            Some(path) => File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let settings = config::Config::builder()
            .set_default("poller.interval_secs", DEFAULT_POLL_INTERVAL_SECS as i64)?
            .set_default("retry.max_attempts", DEFAULT_MAX_ATTEMPTS as i64)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("IMPORTER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "store.root",
                self.root.map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("poller.interval_secs", self.interval_secs.map(|s| s as i64))?
            .set_override_option("retry.max_attempts", self.max_attempts.map(|a| a as i64))?
            .build()
            .with_context(|| match &config_path {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        let config = settings
            .try_deserialize::<RawConfig>()
            .context("Invalid configuration")?
            .into_config();
        config.validate()?;
        Ok(config)
    }
}

/// Shape of the merged sources before sections are filled in. Sections with
/// nothing but defaults may be absent.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    store: Option<StoreSettings>,
    poller: PollerSettings,
    retry: RetrySettings,
}

impl RawConfig {
    fn into_config(self) -> Config {
        Config {
            store: self.store.unwrap_or(StoreSettings { root: None }),
            poller: self.poller,
            retry: self.retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("importer.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [store]
            root = "/srv/imports"

            [poller]
            interval_secs = 5

            [retry]
            max_attempts = 7
            "#,
        );

        let config = Config::builder().config_path(Some(path)).build().unwrap();

        assert_eq!(config.root().unwrap(), Path::new("/srv/imports"));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.retry_policy(), RetryPolicy::new(7));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[store]\nroot = \"/from/file\"\n");

        let config = Config::builder()
            .config_path(Some(path))
            .root(Some(PathBuf::from("/from/cli")))
            .interval_secs(Some(2))
            .build()
            .unwrap();

        assert_eq!(config.store.root, Some(PathBuf::from("/from/cli")));
        assert_eq!(config.poller.interval_secs, 2);
        assert_eq!(config.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::builder()
            .config_path(Some(dir.path().join("absent.toml")))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[retry]\nmax_attempts = 0\n");

        let err = Config::builder().config_path(Some(path)).build().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));

        let config = Config {
            store: StoreSettings { root: None },
            poller: PollerSettings { interval_secs: 0 },
            retry: RetrySettings { max_attempts: 1 },
        };
        assert!(config.validate().is_err());
        assert!(config.root().is_err());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config {
            store: StoreSettings {
                root: Some(PathBuf::from("/data")),
            },
            poller: PollerSettings { interval_secs: 10 },
            retry: RetrySettings { max_attempts: 3 },
        };

        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
