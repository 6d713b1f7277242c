//! Checkout Orchestrator.
//!
//! A [`Checkout`] drives one subscriber's attempt to subscribe to a plan,
//! through one of two activation paths:
//!
//! - wallet pull: connect, make sure the engine may pull the price, call
//!   `subscribe`, then record an `active` subscription;
//! - deposit vault: derive the subscriber's vault address on-chain, record a
//!   `pending` subscription and then its `PENDING` vault. The vault watcher
//!   activates the subscription once the vault is funded and swept.
//!
//! ```text
//! Idle -> WalletConnecting -> WalletReady -> Subscribing -> Activated | Failed
//! Idle -> GeneratingVault -> Watching -> (watcher) Activated
//! ```
//!
//! Every method takes `&mut self`, so one attempt never runs two steps at
//! once. Nothing is retried automatically.

mod boundary;
mod error;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use boundary::{attach_vault, cancel_for_subscriber, open_subscription};
pub use error::CheckoutError;
pub use store::{CheckoutStore, StoreError};

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::deposit_vaults::{DepositVault, InsertDepositVault};
use crate::entities::plans::Plan;
use crate::entities::subscriptions::{InsertSubscription, Subscription};
use crate::entities::{ActivationMode, SubscriptionStatus};
use crate::utils::utc_now;
use crate::web3::amounts::to_token_units;
use crate::web3::{
    AllowanceOutcome, ContractGateway, WalletConnector, WalletSession, plan_id_to_u256,
    random_placeholder_address,
};
use error::parse_address;

/// Where a checkout attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    WalletConnecting,
    WalletReady { address: Address },
    Subscribing,
    Activated { subscription_id: Uuid },
    Failed { reason: String },
    GeneratingVault,
    Watching {
        subscription_id: Uuid,
        vault_address: String,
    },
}

impl CheckoutState {
    /// The subscription this attempt produced, if any.
    pub fn subscription_id(&self) -> Option<Uuid> {
        match self {
            CheckoutState::Activated { subscription_id }
            | CheckoutState::Watching {
                subscription_id, ..
            } => Some(*subscription_id),
            _ => None,
        }
    }
}

/// Result of [`Checkout::subscribe_with_wallet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCheckout {
    /// The wallet was connected by this call. Nothing was sent on-chain;
    /// call again to subscribe.
    Connected { address: Address },
    /// The subscription is active on-chain and recorded.
    Activated(Subscription),
}

/// A recorded vault-mode subscription and its vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultCheckout {
    pub subscription: Subscription,
    pub vault: DepositVault,
}

/// What the store currently holds for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub subscription: Subscription,
    pub vault: Option<DepositVault>,
}

/// Load a plan that may still be subscribed to.
pub async fn load_active_plan<S>(store: &S, plan_id: i64) -> Result<Plan, CheckoutError>
where
    S: CheckoutStore + ?Sized,
{
    let plan = store
        .plan(plan_id)
        .await?
        .ok_or_else(|| CheckoutError::plan_not_found(plan_id))?;
    if !plan.active {
        return Err(CheckoutError::PlanInactive(plan_id));
    }
    Ok(plan)
}

/// Refuse a second active wallet subscription to the same plan.
pub(crate) async fn ensure_not_subscribed<S>(
    store: &S,
    plan_id: i64,
    subscriber: Address,
) -> Result<(), CheckoutError>
where
    S: CheckoutStore + ?Sized,
{
    match store
        .active_wallet_subscription(plan_id, &subscriber.to_string())
        .await?
    {
        Some(existing) => Err(CheckoutError::AlreadySubscribed(existing.id)),
        None => Ok(()),
    }
}

pub(crate) fn onchain_plan_id(plan_id: i64) -> Result<U256, CheckoutError> {
    plan_id_to_u256(plan_id).ok_or(CheckoutError::InvalidPlanId(plan_id))
}

/// An `active` wallet-mode subscription billed one interval from `now`.
pub(crate) fn wallet_subscription(
    plan: &Plan,
    subscriber: Address,
    now: time::PrimitiveDateTime,
) -> InsertSubscription {
    InsertSubscription {
        plan_id: plan.id,
        subscriber_address: subscriber.to_string(),
        status: SubscriptionStatus::Active,
        activation_mode: ActivationMode::Wallet,
        next_billing_at: Some(now + plan.interval.duration()),
    }
}

pub(crate) fn vault_subscription(plan: &Plan, subscriber: Address) -> InsertSubscription {
    InsertSubscription {
        plan_id: plan.id,
        subscriber_address: subscriber.to_string(),
        status: SubscriptionStatus::Pending,
        activation_mode: ActivationMode::Vault,
        next_billing_at: None,
    }
}

pub(crate) fn vault_record(
    subscription: &Subscription,
    plan: &Plan,
    vault_address: Address,
) -> InsertDepositVault {
    InsertDepositVault {
        subscription_id: subscription.id,
        vault_address: vault_address.to_string(),
        subscriber_address: subscription.subscriber_address.clone(),
        plan_id: plan.id,
        merchant_id: plan.merchant_id,
    }
}

/// One subscriber's checkout attempt.
pub struct Checkout<S, W: WalletConnector> {
    store: S,
    connector: W,
    token_decimals: u32,
    state: CheckoutState,
    wallet: Option<WalletSession<W::Gateway>>,
}

impl<S, W> Checkout<S, W>
where
    S: CheckoutStore,
    W: WalletConnector,
{
    pub fn new(store: S, connector: W, token_decimals: u32) -> Self {
        Self {
            store,
            connector,
            token_decimals,
            state: CheckoutState::Idle,
            wallet: None,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn connected_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|session| session.address)
    }

    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        warn!(error = %err, "Checkout failed");
        self.state = CheckoutState::Failed {
            reason: err.to_string(),
        };
        err
    }

    /// The connected wallet's gateway, or a read-only one.
    fn gateway(&self) -> &W::Gateway {
        self.wallet
            .as_ref()
            .map_or_else(|| self.connector.read_only(), |session| &session.gateway)
    }

    /// Request account access from the wallet.
    pub async fn connect_wallet(&mut self) -> Result<Address, CheckoutError> {
        self.state = CheckoutState::WalletConnecting;
        match self.connector.connect().await {
            Ok(session) => {
                let address = session.address;
                self.wallet = Some(session);
                self.state = CheckoutState::WalletReady { address };
                Ok(address)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Wallet-pull path.
    ///
    /// Without a connected wallet this only connects and returns
    /// [`WalletCheckout::Connected`]; the caller confirms by calling again.
    /// On failure nothing is written and the attempt can be repeated.
    pub async fn subscribe_with_wallet(
        &mut self,
        plan_id: i64,
    ) -> Result<WalletCheckout, CheckoutError> {
        let plan = match load_active_plan(&self.store, plan_id).await {
            Ok(plan) => plan,
            Err(err) => return Err(self.fail(err)),
        };

        if self.wallet.is_none() {
            let address = self.connect_wallet().await?;
            return Ok(WalletCheckout::Connected { address });
        }

        self.state = CheckoutState::Subscribing;
        match self.activate_wallet(&plan).await {
            Ok(subscription) => {
                self.state = CheckoutState::Activated {
                    subscription_id: subscription.id,
                };
                Ok(WalletCheckout::Activated(subscription))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn activate_wallet(&self, plan: &Plan) -> Result<Subscription, CheckoutError> {
        let session = self.wallet.as_ref().ok_or(CheckoutError::NoWalletFound)?;
        let amount = to_token_units(plan.price, self.token_decimals)?;
        let token = parse_address(&plan.token_address)?;
        let onchain_id = onchain_plan_id(plan.id)?;
        ensure_not_subscribed(&self.store, plan.id, session.address).await?;
        let gateway = &session.gateway;

        match gateway
            .ensure_allowance(token, gateway.engine_address(), amount)
            .await?
        {
            AllowanceOutcome::Sufficient => {
                debug!(plan_id = plan.id, %amount, "Allowance already covers the price")
            }
            AllowanceOutcome::Approved(tx_hash) => {
                info!(plan_id = plan.id, %amount, %tx_hash, "Token approval confirmed")
            }
        }

        gateway.subscribe(onchain_id).await?;

        let subscription = self
            .store
            .insert_subscription(wallet_subscription(plan, session.address, utc_now()))
            .await?;
        info!(
            subscription_id = %subscription.id,
            plan_id = plan.id,
            subscriber = %session.address,
            "Wallet subscription activated"
        );
        Ok(subscription)
    }

    /// Deposit-vault path.
    ///
    /// The subscriber is the connected wallet, or a random placeholder
    /// address when none is connected. The subscription is written before
    /// its vault; if the vault write fails the error carries the
    /// subscription id for [`Checkout::resume_vault`].
    pub async fn generate_vault(&mut self, plan_id: i64) -> Result<VaultCheckout, CheckoutError> {
        let plan = match load_active_plan(&self.store, plan_id).await {
            Ok(plan) => plan,
            Err(err) => return Err(self.fail(err)),
        };
        self.state = CheckoutState::GeneratingVault;

        let subscriber = match self.connected_address() {
            Some(address) => address,
            None => {
                let placeholder = random_placeholder_address();
                debug!(%placeholder, "No wallet connected, using a placeholder subscriber");
                placeholder
            }
        };

        let result = self.record_vault_checkout(&plan, subscriber).await;
        self.settle_vault(result)
    }

    async fn record_vault_checkout(
        &self,
        plan: &Plan,
        subscriber: Address,
    ) -> Result<VaultCheckout, CheckoutError> {
        // The watcher sweeps in token units, so the price must fit them.
        to_token_units(plan.price, self.token_decimals)?;
        let vault_address = self
            .gateway()
            .deposit_address(subscriber, onchain_plan_id(plan.id)?)
            .await?;

        let subscription = self
            .store
            .insert_subscription(vault_subscription(plan, subscriber))
            .await?;
        let vault = self.insert_vault(&subscription, plan, vault_address).await?;
        Ok(VaultCheckout {
            subscription,
            vault,
        })
    }

    async fn insert_vault(
        &self,
        subscription: &Subscription,
        plan: &Plan,
        vault_address: Address,
    ) -> Result<DepositVault, CheckoutError> {
        self.store
            .insert_vault(vault_record(subscription, plan, vault_address))
            .await
            .map_err(|source| CheckoutError::VaultNotRecorded {
                subscription_id: subscription.id,
                source,
            })
    }

    /// Record the vault of a pending vault-mode subscription whose vault
    /// write failed earlier. Returns the existing vault if there already is
    /// one.
    pub async fn resume_vault(
        &mut self,
        subscription_id: Uuid,
    ) -> Result<VaultCheckout, CheckoutError> {
        self.state = CheckoutState::GeneratingVault;
        let result = self.resume(subscription_id).await;
        self.settle_vault(result)
    }

    async fn resume(&self, subscription_id: Uuid) -> Result<VaultCheckout, CheckoutError> {
        let subscription = self
            .store
            .subscription(subscription_id)
            .await?
            .ok_or_else(|| CheckoutError::subscription_not_found(subscription_id))?;
        if subscription.activation_mode != ActivationMode::Vault {
            return Err(CheckoutError::NotVaultSubscription(subscription_id));
        }
        if let Some(vault) = self.store.vault_for_subscription(subscription_id).await? {
            return Ok(VaultCheckout {
                subscription,
                vault,
            });
        }
        if subscription.status != SubscriptionStatus::Pending {
            return Err(CheckoutError::SubscriptionNotPending(subscription_id));
        }

        let plan = self
            .store
            .plan(subscription.plan_id)
            .await?
            .ok_or_else(|| CheckoutError::plan_not_found(subscription.plan_id))?;
        let subscriber = parse_address(&subscription.subscriber_address)?;
        let vault_address = self
            .gateway()
            .deposit_address(subscriber, onchain_plan_id(plan.id)?)
            .await?;
        let vault = self.insert_vault(&subscription, &plan, vault_address).await?;
        info!(%subscription_id, vault_address = %vault.vault_address, "Vault recorded on resume");
        Ok(VaultCheckout {
            subscription,
            vault,
        })
    }

    fn settle_vault(
        &mut self,
        result: Result<VaultCheckout, CheckoutError>,
    ) -> Result<VaultCheckout, CheckoutError> {
        match result {
            Ok(checkout) => {
                self.track(&checkout.subscription, Some(&checkout.vault));
                info!(
                    subscription_id = %checkout.subscription.id,
                    vault_address = %checkout.vault.vault_address,
                    "Watching deposit vault"
                );
                Ok(checkout)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn track(&mut self, subscription: &Subscription, vault: Option<&DepositVault>) {
        match (subscription.status, vault) {
            (SubscriptionStatus::Active, _) => {
                self.state = CheckoutState::Activated {
                    subscription_id: subscription.id,
                };
            }
            (SubscriptionStatus::Pending, Some(vault)) => {
                self.state = CheckoutState::Watching {
                    subscription_id: subscription.id,
                    vault_address: vault.vault_address.clone(),
                };
            }
            _ => {}
        }
    }

    /// Read a subscription and its vault from the store and follow it.
    pub async fn watch(
        &mut self,
        subscription_id: Uuid,
    ) -> Result<SubscriptionSnapshot, CheckoutError> {
        let subscription = self
            .store
            .subscription(subscription_id)
            .await?
            .ok_or_else(|| CheckoutError::subscription_not_found(subscription_id))?;
        let vault = self.store.vault_for_subscription(subscription_id).await?;
        self.track(&subscription, vault.as_ref());
        Ok(SubscriptionSnapshot {
            subscription,
            vault,
        })
    }

    /// Re-read the subscription this attempt produced. `None` when there is
    /// none yet.
    pub async fn refresh(&mut self) -> Result<Option<SubscriptionSnapshot>, CheckoutError> {
        match self.state.subscription_id() {
            Some(subscription_id) => self.watch(subscription_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Cancel one of the connected wallet's subscriptions. Connects first if
    /// needed. Nothing happens on-chain.
    pub async fn cancel(&mut self, subscription_id: Uuid) -> Result<Subscription, CheckoutError> {
        let subscriber = match self.connected_address() {
            Some(address) => address,
            None => self.connect_wallet().await?,
        };
        cancel_for_subscriber(&self.store, subscription_id, subscriber).await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MemoryStore, ScriptedConnector, ScriptedGateway, monthly_plan};
    use super::*;
    use crate::entities::VaultStatus;
    use crate::web3::GatewayError;

    fn usdc_allowance(units: u64) -> ScriptedGateway {
        ScriptedGateway::new(Address::repeat_byte(0xee)).with_allowance(U256::from(units))
    }

    #[tokio::test]
    async fn test_wallet_checkout_with_sufficient_allowance() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let gateway = usdc_allowance(9_990_000);
        let subscriber = Address::repeat_byte(0x42);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::account(subscriber, gateway.clone()),
            6,
        );

        let first = checkout.subscribe_with_wallet(7).await.unwrap();
        assert_eq!(first, WalletCheckout::Connected { address: subscriber });
        assert_eq!(
            checkout.state(),
            &CheckoutState::WalletReady { address: subscriber }
        );
        assert_eq!(gateway.log().subscribe_calls, 0);

        let WalletCheckout::Activated(subscription) =
            checkout.subscribe_with_wallet(7).await.unwrap()
        else {
            panic!("expected activation");
        };
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.activation_mode, ActivationMode::Wallet);
        assert_eq!(subscription.subscriber_address, subscriber.to_string());
        let billed_after = subscription.next_billing_at.unwrap() - subscription.created_at;
        assert!((billed_after - time::Duration::days(30)).abs() < time::Duration::seconds(5));

        let log = gateway.log();
        assert_eq!(log.approvals, 0);
        assert_eq!(log.subscribe_calls, 1);
        assert_eq!(
            checkout.state(),
            &CheckoutState::Activated {
                subscription_id: subscription.id
            }
        );
        assert_eq!(store.subscriptions().len(), 1);
        assert!(store.vaults().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_checkout_approves_exact_price_when_short() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let gateway = usdc_allowance(1_000_000);
        let mut checkout = Checkout::new(
            store,
            ScriptedConnector::account(Address::repeat_byte(0x42), gateway.clone()),
            6,
        );
        checkout.connect_wallet().await.unwrap();
        checkout.subscribe_with_wallet(7).await.unwrap();

        let log = gateway.log();
        assert_eq!(log.approvals, 1);
        assert_eq!(log.allowance, U256::from(9_990_000u64));
        assert_eq!(log.subscribe_calls, 1);
    }

    #[tokio::test]
    async fn test_rejected_subscribe_writes_nothing_and_can_retry() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let gateway = usdc_allowance(9_990_000);
        gateway.fail_next_subscribe(GatewayError::TransactionRejected);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::account(Address::repeat_byte(0x42), gateway.clone()),
            6,
        );
        checkout.connect_wallet().await.unwrap();

        let err = checkout.subscribe_with_wallet(7).await.unwrap_err();
        assert!(matches!(err, CheckoutError::TransactionRejected));
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
        assert!(store.subscriptions().is_empty());

        let retried = checkout.subscribe_with_wallet(7).await.unwrap();
        assert!(matches!(retried, WalletCheckout::Activated(_)));
        assert_eq!(store.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_wallet_fails_checkout() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let mut checkout = Checkout::new(
            store,
            ScriptedConnector::missing(usdc_allowance(0)),
            6,
        );
        let err = checkout.subscribe_with_wallet(7).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NoWalletFound));
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));

        let mut checkout = Checkout::new(
            MemoryStore::with_plan(monthly_plan(7, "9.99")),
            ScriptedConnector::rejecting(usdc_allowance(0)),
            6,
        );
        let err = checkout.connect_wallet().await.unwrap_err();
        assert!(matches!(err, CheckoutError::UserRejected));
    }

    #[tokio::test]
    async fn test_over_precise_price_is_rejected_before_any_transaction() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.9999999"));
        let gateway = usdc_allowance(0);
        let mut checkout = Checkout::new(
            store,
            ScriptedConnector::account(Address::repeat_byte(0x42), gateway.clone()),
            6,
        );
        checkout.connect_wallet().await.unwrap();
        let err = checkout.subscribe_with_wallet(7).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAmount(_)));
        assert_eq!(gateway.log().approvals, 0);
        assert_eq!(gateway.log().subscribe_calls, 0);
    }

    #[tokio::test]
    async fn test_over_precise_price_records_no_vault() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.9999999"));
        let gateway = usdc_allowance(0);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::missing(gateway.clone()),
            6,
        );

        let err = checkout.generate_vault(7).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAmount(_)));
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
        assert_eq!(gateway.log().derivations, 0);
        assert!(store.subscriptions().is_empty());
        assert!(store.vaults().is_empty());
    }

    #[tokio::test]
    async fn test_second_wallet_checkout_sends_nothing() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let gateway = usdc_allowance(9_990_000);
        let subscriber = Address::repeat_byte(0x42);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::account(subscriber, gateway.clone()),
            6,
        );
        checkout.connect_wallet().await.unwrap();
        let WalletCheckout::Activated(first) = checkout.subscribe_with_wallet(7).await.unwrap()
        else {
            panic!("expected activation");
        };

        let err = checkout.subscribe_with_wallet(7).await.unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadySubscribed(id) if id == first.id));
        assert_eq!(gateway.log().subscribe_calls, 1);
        assert_eq!(store.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_vault_checkout_without_wallet_uses_placeholder() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let gateway = usdc_allowance(0);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::missing(gateway.clone()),
            6,
        );

        let result = checkout.generate_vault(7).await.unwrap();
        assert_eq!(gateway.log().derivations, 1);

        let subscription = &result.subscription;
        assert_eq!(subscription.status, SubscriptionStatus::Pending);
        assert_eq!(subscription.activation_mode, ActivationMode::Vault);
        assert_eq!(subscription.next_billing_at, None);

        let placeholder: Address = subscription.subscriber_address.parse().unwrap();
        let expected = ScriptedGateway::derive(placeholder, U256::from(7u64));
        assert_eq!(result.vault.vault_address, expected.to_string());
        assert_eq!(result.vault.subscription_id, subscription.id);
        assert_eq!(result.vault.subscriber_address, subscription.subscriber_address);
        assert_eq!(result.vault.status, VaultStatus::Pending);
        assert_eq!(result.vault.plan_id, 7);

        assert_eq!(store.subscriptions().len(), 1);
        assert_eq!(store.vaults().len(), 1);
        assert_eq!(
            checkout.state(),
            &CheckoutState::Watching {
                subscription_id: subscription.id,
                vault_address: expected.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_vault_checkout_uses_connected_wallet() {
        let subscriber = Address::repeat_byte(0x42);
        let mut checkout = Checkout::new(
            MemoryStore::with_plan(monthly_plan(7, "9.99")),
            ScriptedConnector::account(subscriber, usdc_allowance(0)),
            6,
        );
        checkout.connect_wallet().await.unwrap();
        let result = checkout.generate_vault(7).await.unwrap();
        assert_eq!(result.subscription.subscriber_address, subscriber.to_string());
        assert_eq!(
            result.vault.vault_address,
            ScriptedGateway::derive(subscriber, U256::from(7u64)).to_string()
        );
    }

    #[tokio::test]
    async fn test_failed_vault_write_can_be_resumed() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        store.fail_next_vault_insert();
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::missing(usdc_allowance(0)),
            6,
        );

        let err = checkout.generate_vault(7).await.unwrap_err();
        let CheckoutError::VaultNotRecorded {
            subscription_id, ..
        } = err
        else {
            panic!("expected VaultNotRecorded, got {err:?}");
        };
        assert_eq!(store.subscriptions().len(), 1);
        assert!(store.vaults().is_empty());

        let resumed = checkout.resume_vault(subscription_id).await.unwrap();
        assert_eq!(resumed.subscription.id, subscription_id);
        let again = checkout.resume_vault(subscription_id).await.unwrap();
        assert_eq!(again.vault, resumed.vault);
        assert_eq!(store.vaults().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_follows_watcher_activation() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::missing(usdc_allowance(0)),
            6,
        );
        assert_eq!(checkout.refresh().await.unwrap(), None);

        let result = checkout.generate_vault(7).await.unwrap();
        let snapshot = checkout.refresh().await.unwrap().unwrap();
        assert_eq!(snapshot.subscription.status, SubscriptionStatus::Pending);

        store.activate(result.subscription.id);
        let snapshot = checkout.refresh().await.unwrap().unwrap();
        assert_eq!(snapshot.subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            checkout.state(),
            &CheckoutState::Activated {
                subscription_id: result.subscription.id
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let subscriber = Address::repeat_byte(0x42);
        let mut checkout = Checkout::new(
            store.clone(),
            ScriptedConnector::account(subscriber, usdc_allowance(9_990_000)),
            6,
        );
        checkout.connect_wallet().await.unwrap();
        let WalletCheckout::Activated(subscription) =
            checkout.subscribe_with_wallet(7).await.unwrap()
        else {
            panic!("expected activation");
        };

        let cancelled = checkout.cancel(subscription.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        let again = checkout.cancel(subscription.id).await.unwrap();
        assert_eq!(again, cancelled);
    }

    #[tokio::test]
    async fn test_plan_lookup_errors() {
        let mut plan = monthly_plan(7, "9.99");
        plan.active = false;
        let mut checkout = Checkout::new(
            MemoryStore::with_plan(plan),
            ScriptedConnector::missing(usdc_allowance(0)),
            6,
        );
        assert!(matches!(
            checkout.generate_vault(7).await,
            Err(CheckoutError::PlanInactive(7))
        ));
        assert!(matches!(
            checkout.generate_vault(8).await,
            Err(CheckoutError::NotFound(_))
        ));
    }
}
