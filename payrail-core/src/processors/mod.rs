//! Background processors.
//!
//! - `VaultWatcher`: receives `VaultCreated`, sweeps funded deposit vaults
//!   and activates their subscriptions

pub mod vault_watcher;

pub use vault_watcher::{
    ScanSummary, SweepAction, VaultLedger, VaultWatcher, WatchError, inspect_vault,
};
