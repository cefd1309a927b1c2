//! Layered server configuration.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `jsonvault.toml` in the working directory
//! 3. Legacy variables `PORT`, `INIT_DB` and `NODE_ENV`
//! 4. `JSONVAULT_*` environment variables, `__` separating sections
//!    (`JSONVAULT_STORE__PATH` maps to `store.path`)

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use jsonvault_store::StoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "jsonvault.toml";
pub const ENV_PREFIX: &str = "JSONVAULT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Controls whether internal error detail is echoed to callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// Create tables, indexes and the history view before listening.
    pub init_db: bool,
    pub max_body_bytes: usize,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            environment: Environment::Production,
            init_db: false,
            max_body_bytes: 10 * 1024 * 1024,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load a `.env` file when present, then [`load`](Self::load).
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::load()
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = Self::figment(file).extract()?;
        config.apply_legacy_env()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider chain without the legacy variables.
    pub fn figment(file: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Honour `PORT`, `INIT_DB=true` and `NODE_ENV=development` unless the
    /// matching `JSONVAULT_*` variable is set.
    fn apply_legacy_env(&mut self) -> Result<(), ConfigError> {
        if !prefixed_var_set("BIND_ADDR") {
            if let Ok(port) = std::env::var("PORT") {
                let port = port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                    field: "PORT".into(),
                    reason: format!("'{port}' is not a port number"),
                })?;
                self.bind_addr.set_port(port);
            }
        }
        if !prefixed_var_set("INIT_DB") && std::env::var("INIT_DB").is_ok_and(|v| v == "true") {
            self.init_db = true;
        }
        if !prefixed_var_set("ENVIRONMENT")
            && std::env::var("NODE_ENV").is_ok_and(|v| v == "development")
        {
            self.environment = Environment::Development;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.pool_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_bytes".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = path.into();
        self
    }
}

fn prefixed_var_set(key: &str) -> bool {
    std::env::var_os(format!("{ENV_PREFIX}{key}")).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.environment, Environment::Production);
        assert!(!c.init_db);
        assert_eq!(c.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(c.store.pool_size, 10);
    }

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = ServerConfig::load().expect("config loads");
            assert_eq!(config, ServerConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    bind_addr = "0.0.0.0:8080"
                    environment = "development"

                    [store]
                    path = "data/vault.db"
                    pool_size = 4
                "#,
            )?;
            jail.set_env("JSONVAULT_STORE__POOL_SIZE", "2");

            let config = ServerConfig::load().expect("config loads");
            assert_eq!(config.bind_addr.port(), 8080);
            assert!(config.environment.is_development());
            assert_eq!(config.store.path, PathBuf::from("data/vault.db"));
            assert_eq!(config.store.pool_size, 2);
            Ok(())
        });
    }

    #[test]
    fn legacy_variables() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "4100");
            jail.set_env("INIT_DB", "true");
            jail.set_env("NODE_ENV", "development");

            let config = ServerConfig::load().expect("config loads");
            assert_eq!(config.bind_addr, "127.0.0.1:4100".parse::<SocketAddr>().unwrap());
            assert!(config.init_db);
            assert_eq!(config.environment, Environment::Development);
            Ok(())
        });
    }

    #[test]
    fn prefixed_variables_beat_legacy() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "4100");
            jail.set_env("JSONVAULT_BIND_ADDR", "127.0.0.1:5000");
            jail.set_env("INIT_DB", "true");
            jail.set_env("JSONVAULT_INIT_DB", "false");

            let config = ServerConfig::load().expect("config loads");
            assert_eq!(config.bind_addr.port(), 5000);
            assert!(!config.init_db);
            Ok(())
        });
    }

    #[test]
    fn invalid_port_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "http");
            let err = ServerConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "PORT"));
            Ok(())
        });
    }

    #[test]
    fn zero_pool_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("JSONVAULT_STORE__POOL_SIZE", "0");
            assert!(matches!(
                ServerConfig::load(),
                Err(ConfigError::InvalidValue { .. })
            ));
            Ok(())
        });
    }
}
