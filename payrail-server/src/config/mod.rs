//! Configuration module for payrail-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AuthConfig, ChainConfig, ServerConfig, SharedConfig, WatcherConfig};
use alloy_signer_local::PrivateKeySigner;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Minimum length of the session signing secret, in bytes.
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Largest token precision a price can be scaled to.
const MAX_TOKEN_DECIMALS: u32 = 36;

/// Environment variable holding the vault sweeper's private key.
pub const SWEEPER_KEY_ENV: &str = "PAYRAIL_SWEEPER_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,

    #[error("{SWEEPER_KEY_ENV} is not a valid private key")]
    InvalidSweeperKey,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub chain: ChainConfig,
    pub watcher: WatcherConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            auth: Arc::new(RwLock::new(self.auth)),
            chain: Arc::new(RwLock::new(self.chain)),
            watcher: Arc::new(RwLock::new(self.watcher)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.auth.session_secret.len() < MIN_SESSION_SECRET_LEN {
        return Err(ConfigError::ValidationError(format!(
            "auth.session_secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
        )));
    }
    if config.chain.token_decimals > MAX_TOKEN_DECIMALS {
        return Err(ConfigError::ValidationError(format!(
            "chain.token_decimals must not exceed {MAX_TOKEN_DECIMALS}"
        )));
    }
    if config.chain.engine_address.is_zero() {
        return Err(ConfigError::ValidationError(
            "chain.engine_address must not be the zero address".to_string(),
        ));
    }
    if config.watcher.batch_size <= 0 {
        return Err(ConfigError::ValidationError(
            "watcher.batch_size must be positive".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        auth: AuthConfig::new(file_config.auth.session_secret.into_bytes().into_boxed_slice()),
        chain: ChainConfig {
            rpc_url: file_config.chain.rpc_url,
            chain_id: file_config.chain.chain_id,
            engine_address: file_config.chain.engine_address,
            token_decimals: file_config.chain.token_decimals,
        },
        watcher: WatcherConfig {
            batch_size: file_config.watcher.batch_size,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

/// Get the vault sweeper key from the environment. `None` disables the
/// vault watcher.
pub fn get_sweeper_key() -> Result<Option<PrivateKeySigner>, ConfigError> {
    match std::env::var(SWEEPER_KEY_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSweeperKey),
        _ => Ok(None),
    }
}
