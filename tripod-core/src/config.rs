//! Configuration system for Tripod.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! The config file is `--config <path>` when given, otherwise `./tripod.toml` if present.

use crate::error::ConfigError;
use crate::region::RegionTable;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tripod.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripodConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub regions: RegionConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            tls: TlsConfig::default(),
        }
    }
}

/// TLS settings. Certificates are PEM files, usually mounted from a secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cert_path: PathBuf::from("/run/secrets/tls/tls.crt"),
            key_path: PathBuf::from("/run/secrets/tls/tls.key"),
        }
    }
}

/// Which metadata source to read the cluster from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The Kubernetes API, using the in-cluster service account.
    #[default]
    Kubernetes,
    /// A JSON or YAML snapshot file.
    File,
}

/// Metadata source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Namespace whose pods are reported.
    pub namespace: String,
    /// API server base URL; derived from the in-cluster environment when unset.
    pub api_server: Option<String>,
    /// Snapshot file for the `file` source.
    pub fixture: Option<PathBuf>,
    /// Per-request timeout against the API server.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Kubernetes,
            namespace: "default".to_string(),
            api_server: None,
            fixture: None,
            timeout_secs: 10,
        }
    }
}

/// Extra or replacing region -> country entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub overrides: BTreeMap<String, String>,
}

impl RegionConfig {
    /// The builtin table with the configured overrides applied.
    pub fn table(&self) -> RegionTable {
        RegionTable::builtin().with_overrides(self.overrides.clone())
    }
}

impl TripodConfig {
    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".into(),
            });
        }
        if self.source.kind == SourceKind::File && self.source.fixture.is_none() {
            return Err(ConfigError::Invalid {
                message: "source.fixture is required when source.kind = \"file\"".into(),
            });
        }
        if self.source.namespace.is_empty() {
            return Err(ConfigError::Invalid {
                message: "source.namespace must not be empty".into(),
            });
        }
        if let Some((region, country)) = self
            .regions
            .overrides
            .iter()
            .find(|(_, country)| !is_country_code(country))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "regions.overrides.{region}: {country:?} is not a two-letter code"
                ),
            });
        }
        Ok(())
    }
}

/// Two uppercase ASCII letters, the shape of every builtin table entry.
fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Load and validate configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `TRIPOD_`, `__` separates sections)
/// 2. The explicit config file, or `./tripod.toml` when none is given
/// 3. Built-in defaults
///
/// An explicit path that does not exist is an error; a missing default file is not.
pub fn load_config(path: Option<&Path>) -> Result<TripodConfig, ConfigError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Merge the configuration layers without validating the result.
///
/// For callers that apply their own overrides (command-line flags) before
/// calling [`TripodConfig::validate`].
pub fn read_config(path: Option<&Path>) -> Result<TripodConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TripodConfig::default()));

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                figment = figment.merge(Toml::file(default));
            }
        }
    }

    // TRIPOD_SERVER__PORT, TRIPOD_SOURCE__NAMESPACE, TRIPOD_SERVER__TLS__ENABLED, ...
    figment = figment.merge(Env::prefixed("TRIPOD_").split("__"));

    Ok(figment.extract().map_err(Box::new)?)
}
