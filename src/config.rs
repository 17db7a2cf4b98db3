//! Service configuration.
//!
//! Loaded from a TOML file (every key optional), then overridden from the
//! environment. Priority: environment variable > config file > default.

use crate::auth::{DEFAULT_HASH_ROUNDS, DEFAULT_TOKEN_TTL_SECS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_JWT_SECRET: &str = "CHATD_JWT_SECRET";
pub const ENV_DB_PATH: &str = "CHATD_DB_PATH";
pub const ENV_PORT: &str = "CHATD_PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Inbound request timeout enforced by the HTTP layer.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token lifetime.
    pub token_ttl_secs: u64,
    /// PBKDF2 rounds for newly created password hashes.
    pub hash_rounds: u32,
    /// HS256 signing secret. Logins fail with 500 while unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            hash_rounds: DEFAULT_HASH_ROUNDS,
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file. Ignored by the memory backend.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("chat.db"),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file
    /// is read if present, otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// `~/.config/chatd/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "chatd").map(|d| d.config_dir().join("config.toml"))
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production). Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        if let Some(secret) = get(ENV_JWT_SECRET) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(path) = get(ENV_DB_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(port) = get(ENV_PORT) {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid {ENV_PORT}"),
            }
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.jwt_secret.is_some() {
            copy.auth.jwt_secret = Some("<redacted>".into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.auth.hash_rounds, DEFAULT_HASH_ROUNDS);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [gateway]
            port = 9000

            [auth]
            jwt_secret = "s3cret"

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Config::from_toml("[store]\nbackend = \"postgres\"").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_JWT_SECRET, "from-env"),
            (ENV_DB_PATH, "/tmp/chat-test.db"),
            (ENV_PORT, "7070"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::from_toml("[auth]\njwt_secret = \"from-file\"").unwrap();
        config.apply_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(config.store.path, PathBuf::from("/tmp/chat-test.db"));
        assert_eq!(config.gateway.port, 7070);
    }

    #[test]
    fn blank_or_invalid_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| match k {
            ENV_JWT_SECRET => Some("   ".into()),
            ENV_PORT => Some("not-a-port".into()),
            _ => None,
        });

        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn redacted_hides_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("s3cret".into());

        let shown = config.redacted().to_toml().unwrap();
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn loads_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[gateway]\nrequest_timeout_secs = 5\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.gateway.request_timeout_secs, 5);
    }
}
