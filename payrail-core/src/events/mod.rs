//! Events passed between the HTTP API and background processors.
//!
//! Events are ephemeral: losing one only delays the watcher until its next
//! scheduled scan.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, VaultCreatedReceiver, VaultCreatedSender, vault_created_channel,
};
pub use types::VaultCreated;
