/// Vault watcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Maximum number of unswept vaults inspected per scan.
    pub batch_size: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}
