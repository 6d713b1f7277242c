//! Configuration types for Payrail.
//!
//! These types represent the validated runtime configuration used by the
//! server and the vault watcher. Loading and parsing the TOML file is
//! handled by the server crate.

mod auth;
mod chain;
mod server;
mod watcher;

pub use auth::AuthConfig;
pub use chain::{ChainConfig, DEFAULT_TOKEN_DECIMALS};
pub use server::ServerConfig;
pub use watcher::WatcherConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// Everything except `server` is replaced on SIGHUP.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Session token signing.
    pub auth: Arc<RwLock<AuthConfig>>,
    /// RPC endpoint and contract addresses.
    pub chain: Arc<RwLock<ChainConfig>>,
    /// Vault watcher tuning.
    pub watcher: Arc<RwLock<WatcherConfig>>,
}
