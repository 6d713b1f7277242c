//! VaultWatcher processor.
//!
//! The VaultWatcher is responsible for:
//! - Scanning deposit vaults that are not swept yet
//! - Reading each vault's token balance and marking it `FUNDED` once it
//!   covers the plan price
//! - Calling `processDeposit` with the sweeper key and, once confirmed,
//!   settling the vault, the subscription and the merchant revenue together
//! - Tightening its scan cadence when `VaultCreated` events arrive

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use kanau::processor::Processor;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};

use crate::config::{ChainConfig, WatcherConfig};
use crate::entities::VaultStatus;
use crate::entities::deposit_vaults::{
    CompleteVaultSweep, ListUnsweptVaults, MarkVaultFunded, UnsweptVault,
};
use crate::events::VaultCreatedReceiver;
use crate::framework::DatabaseProcessor;
use crate::utils::scan_interval::scan_interval;
use crate::utils::utc_now;
use crate::web3::amounts::{AmountError, to_token_units};
use crate::web3::{
    ContractGateway, GatewayError, LocalSignerConnector, WalletConnector, WalletError,
    plan_id_to_u256,
};

/// Errors that can occur while inspecting or sweeping a vault.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("chain error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("sweeper wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("invalid plan price: {0}")]
    Amount(#[from] AmountError),

    #[error("invalid address stored: {0}")]
    InvalidAddress(String),

    #[error("plan id {0} cannot be used on-chain")]
    InvalidPlanId(i64),
}

/// What to do with a vault after reading its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// Not enough funds yet.
    Wait,
    /// Funds cover the price: sweep, marking the vault `FUNDED` first if it
    /// is not already.
    Sweep { mark_funded: bool },
    /// The vault was marked `FUNDED` but its funds are gone, so an earlier
    /// sweep may have been confirmed without being recorded. Ask the engine.
    Reconcile,
}

pub fn sweep_action(status: VaultStatus, balance: U256, required: U256) -> SweepAction {
    match status {
        VaultStatus::Swept => SweepAction::Wait,
        _ if balance >= required => SweepAction::Sweep {
            mark_funded: status == VaultStatus::Pending,
        },
        VaultStatus::Funded => SweepAction::Reconcile,
        VaultStatus::Pending => SweepAction::Wait,
    }
}

/// Vault bookkeeping the watcher writes.
#[async_trait]
pub trait VaultLedger: Send + Sync {
    async fn mark_funded(&self, vault_id: i64) -> Result<(), sqlx::Error>;

    /// Settle vault, subscription and merchant revenue together.
    async fn complete_sweep(&self, sweep: CompleteVaultSweep) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl VaultLedger for DatabaseProcessor {
    async fn mark_funded(&self, vault_id: i64) -> Result<(), sqlx::Error> {
        self.process(MarkVaultFunded { vault_id }).await?;
        Ok(())
    }

    async fn complete_sweep(&self, sweep: CompleteVaultSweep) -> Result<(), sqlx::Error> {
        self.process(sweep).await
    }
}

/// Totals of one scan, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub inspected: usize,
    pub swept: usize,
    pub failed: usize,
}

/// Sweeps funded deposit vaults and activates their subscriptions.
pub struct VaultWatcher {
    db: DatabaseProcessor,
    chain: Arc<RwLock<ChainConfig>>,
    watcher: Arc<RwLock<WatcherConfig>>,
    sweeper: PrivateKeySigner,
}

impl VaultWatcher {
    pub fn new(
        db: DatabaseProcessor,
        chain: Arc<RwLock<ChainConfig>>,
        watcher: Arc<RwLock<WatcherConfig>>,
        sweeper: PrivateKeySigner,
    ) -> Self {
        Self {
            db,
            chain,
            watcher,
            sweeper,
        }
    }

    /// Run until the shutdown signal is set.
    ///
    /// Chain and watcher settings are re-read before every scan, so a
    /// configuration reload takes effect on the next one.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut event_rx: VaultCreatedReceiver,
    ) {
        info!(sweeper = %self.sweeper.address(), "VaultWatcher started");
        let mut last_activity = utc_now();

        loop {
            let sleep_for = scan_interval(last_activity, utc_now());

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("VaultWatcher received shutdown signal");
                        break;
                    }
                }

                Some(event) = event_rx.recv() => {
                    debug!(
                        subscription_id = %event.subscription_id,
                        vault_id = event.vault_id,
                        "Received VaultCreated"
                    );
                    last_activity = last_activity.max(event.created_at);
                }

                _ = tokio::time::sleep(sleep_for.unsigned_abs()) => {
                    match self.scan().await {
                        Ok(summary) if summary.inspected > 0 => info!(
                            inspected = summary.inspected,
                            swept = summary.swept,
                            failed = summary.failed,
                            "Vault scan finished"
                        ),
                        Ok(_) => debug!("No unswept vaults"),
                        Err(e) => error!(error = %e, "Vault scan failed"),
                    }
                }
            }
        }

        info!("VaultWatcher shutdown complete");
    }

    /// Inspect every unswept vault once.
    pub async fn scan(&self) -> Result<ScanSummary, WatchError> {
        let chain = self.chain.read().await.clone();
        let limit = self.watcher.read().await.batch_size;

        let vaults = self.db.process(ListUnsweptVaults { limit }).await?;
        let mut summary = ScanSummary {
            inspected: vaults.len(),
            ..ScanSummary::default()
        };
        if vaults.is_empty() {
            return Ok(summary);
        }

        let session = LocalSignerConnector::new(&chain, Some(self.sweeper.clone()))
            .connect()
            .await?;

        for vault in &vaults {
            match inspect_vault(&self.db, &session.gateway, vault, chain.token_decimals).await {
                Ok(true) => summary.swept += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        vault_id = vault.id,
                        vault_address = %vault.vault_address,
                        error = %e,
                        "Failed to process vault"
                    );
                }
            }
        }
        Ok(summary)
    }
}

/// Check one vault's balance and sweep it if it covers the plan price.
/// Returns whether the vault was settled.
pub async fn inspect_vault<L, G>(
    ledger: &L,
    gateway: &G,
    vault: &UnsweptVault,
    token_decimals: u32,
) -> Result<bool, WatchError>
where
    L: VaultLedger + ?Sized,
    G: ContractGateway + ?Sized,
{
    let required = to_token_units(vault.price, token_decimals)?;
    let token = parse_address(&vault.token_address)?;
    let holder = parse_address(&vault.vault_address)?;
    let subscriber = parse_address(&vault.subscriber_address)?;
    let plan_id =
        plan_id_to_u256(vault.plan_id).ok_or(WatchError::InvalidPlanId(vault.plan_id))?;

    let balance = gateway.token_balance(token, holder).await?;
    match sweep_action(vault.status, balance, required) {
        SweepAction::Wait => {
            debug!(vault_id = vault.id, %balance, %required, "Vault not funded yet");
            Ok(false)
        }
        SweepAction::Sweep { mark_funded } => {
            if mark_funded {
                ledger.mark_funded(vault.id).await?;
                info!(vault_id = vault.id, %balance, "Vault funded");
            }
            let tx_hash = gateway.process_deposit(subscriber, plan_id).await?;
            settle(ledger, vault).await?;
            info!(
                vault_id = vault.id,
                subscription_id = %vault.subscription_id,
                %tx_hash,
                "Vault swept, subscription activated"
            );
            Ok(true)
        }
        SweepAction::Reconcile => {
            if !gateway.is_subscription_active(subscriber, plan_id).await? {
                return Ok(false);
            }
            settle(ledger, vault).await?;
            warn!(
                vault_id = vault.id,
                subscription_id = %vault.subscription_id,
                "Recorded a sweep that was confirmed earlier"
            );
            Ok(true)
        }
    }
}

async fn settle<L>(ledger: &L, vault: &UnsweptVault) -> Result<(), WatchError>
where
    L: VaultLedger + ?Sized,
{
    ledger
        .complete_sweep(CompleteVaultSweep {
            vault_id: vault.id,
            subscription_id: vault.subscription_id,
            merchant_id: vault.merchant_id,
            price: vault.price,
            next_billing_at: utc_now() + vault.interval.duration(),
        })
        .await?;
    Ok(())
}

fn parse_address(raw: &str) -> Result<Address, WatchError> {
    raw.parse()
        .map_err(|_| WatchError::InvalidAddress(raw.to_string()))
}
