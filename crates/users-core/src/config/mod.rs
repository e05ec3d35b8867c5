//! Configuration for users-core
//!
//! Values come from an optional TOML file, then `TRELLIS__*` environment
//! variables (`TRELLIS__SESSION__MAX_TOKEN_LIFETIME_SECONDS=600`). Anything
//! not set falls back to the defaults below.

use std::net::SocketAddr;

use config::{Config, Environment, File};
use serde::Deserialize;
use trellis_auth_core::SecretsConfig;
use trellis_infra_common::{parse_log_level, LoggingConfig};

use crate::jwt::SessionConfig;
use crate::types::NewUser;
use crate::validation::{DEFAULT_MIN_STRENGTH_LEVEL, MAX_STRENGTH_LEVEL};
use crate::{Error, Result};

const ENV_PREFIX: &str = "TRELLIS";

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_bind_address: String,
    pub secrets: SecretsConfig,
    pub session: SessionConfig,
    pub password: PasswordConfig,
    pub roles: RolesConfig,
    pub logging: LogSettings,
    /// Users registered at startup
    pub seed_users: Vec<NewUser>,
}

/// Password configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub min_strength_level: u8,
}

/// Where roles are resolved. Without a base URL the local role table is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    /// Include source file and line in each event
    pub file_info: bool,
    /// Log span open and close events
    pub log_spans: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_bind_address: "127.0.0.1:3200".to_string(),
            secrets: SecretsConfig::default(),
            session: SessionConfig::default(),
            password: PasswordConfig::default(),
            roles: RolesConfig::default(),
            logging: LogSettings::default(),
            seed_users: Vec::new(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_strength_level: DEFAULT_MIN_STRENGTH_LEVEL,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
            log_spans: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `path` (if any) and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;
        self.session.validate()?;

        if !(1..=MAX_STRENGTH_LEVEL).contains(&self.password.min_strength_level) {
            return Err(Error::Config(format!(
                "password.min_strength_level must be between 1 and {}, got {}",
                MAX_STRENGTH_LEVEL, self.password.min_strength_level
            )));
        }

        if let Some(url) = &self.roles.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "roles.base_url must be an http(s) URL, got {:?}",
                    url
                )));
            }
        }

        parse_log_level(&self.logging.level).map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.api_bind_address
            .parse()
            .map_err(|e| {
                let address = &self.api_bind_address;
                Error::Config(format!("Invalid api_bind_address {:?}: {}", address, e))
            })
    }
}

impl LogSettings {
    pub fn to_logging_config(&self, app_name: &str) -> Result<LoggingConfig> {
        let level = parse_log_level(&self.level).map_err(|e| Error::Config(e.to_string()))?;
        let mut config = LoggingConfig::new(level, app_name);
        if self.json {
            config = config.with_json();
        }
        if self.file_info {
            config = config.with_file_info();
        }
        if self.log_spans {
            config = config.with_spans();
        }
        Ok(config)
    }
}
