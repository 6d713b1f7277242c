//! TOML file configuration structures.
//!
//! These structs directly map to the `payrail-config.toml` file format.

use alloy_primitives::Address;
use payrail_core::config::DEFAULT_TOKEN_DECIMALS;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Merchant session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Key for signing merchant session tokens. At least 32 bytes.
    pub session_secret: String,
}

/// Chain access.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: Url,
    pub chain_id: u64,
    /// Address of the subscription engine contract.
    pub engine_address: Address,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
}

fn default_token_decimals() -> u32 {
    DEFAULT_TOKEN_DECIMALS
}

/// Vault watcher section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> i64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[auth]
session_secret = "0123456789abcdef0123456789abcdef"

[chain]
rpc_url = "https://sepolia.base.org"
chain_id = 84532
engine_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
token_decimals = 18

[watcher]
batch_size = 25
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.chain.chain_id, 84532);
        assert_eq!(config.chain.token_decimals, 18);
        assert_eq!(
            config.chain.engine_address,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(config.watcher.batch_size, 25);
    }

    #[test]
    fn test_optional_sections_default() {
        let toml_str = r#"
[auth]
session_secret = "0123456789abcdef0123456789abcdef"

[chain]
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337
engine_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.chain.token_decimals, DEFAULT_TOKEN_DECIMALS);
        assert_eq!(config.watcher.batch_size, 100);
    }

    #[test]
    fn test_missing_chain_section_is_an_error() {
        let toml_str = r#"
[auth]
session_secret = "0123456789abcdef0123456789abcdef"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
