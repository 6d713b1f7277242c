//! Event channel factories and handles.

use super::types::VaultCreated;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for VaultCreated events.
pub type VaultCreatedSender = mpsc::Sender<VaultCreated>;
/// Receiver handle for VaultCreated events.
pub type VaultCreatedReceiver = mpsc::Receiver<VaultCreated>;

/// Create a new VaultCreated channel.
///
/// Multiple senders can be cloned from the returned sender; the vault
/// watcher owns the receiver.
pub fn vault_created_channel() -> (VaultCreatedSender, VaultCreatedReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
