//! Application state shared across all request handlers.

use alloy_primitives::Address;
use payrail_core::config::SharedConfig;
use payrail_core::events::{VaultCreated, VaultCreatedSender};
use payrail_core::framework::DatabaseProcessor;
use payrail_core::web3::DeclaredWalletConnector;
use sqlx::PgPool;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Configuration sections (auth, chain and watcher reload on SIGHUP).
    pub config: SharedConfig,
    /// Feeds the vault watcher. `None` when no sweeper key is configured.
    pub vault_events: Option<VaultCreatedSender>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: SharedConfig,
        vault_events: Option<VaultCreatedSender>,
    ) -> Self {
        Self {
            db,
            config,
            vault_events,
        }
    }

    pub fn processor(&self) -> DatabaseProcessor {
        DatabaseProcessor::new(self.db.clone())
    }

    /// A connector for an address the subscriber declared, bound to the
    /// current chain configuration.
    pub async fn declared_wallet(&self, subscriber: Option<Address>) -> DeclaredWalletConnector {
        let chain = self.config.chain.read().await;
        DeclaredWalletConnector::new(&chain, subscriber)
    }

    pub async fn token_decimals(&self) -> u32 {
        self.config.chain.read().await.token_decimals
    }

    /// Tell the vault watcher about a new vault. Best effort.
    pub async fn notify_vault_created(&self, event: VaultCreated) {
        let Some(sender) = &self.vault_events else {
            return;
        };
        if let Err(e) = sender.send(event).await {
            tracing::warn!(error = %e, "Failed to emit VaultCreated, watcher stopped");
        }
    }
}
