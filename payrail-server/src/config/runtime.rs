//! Runtime configuration re-exports.
//!
//! The validated config types are defined in `payrail-core::config`.

pub use payrail_core::config::{
    AuthConfig, ChainConfig, ServerConfig, SharedConfig, WatcherConfig,
};
