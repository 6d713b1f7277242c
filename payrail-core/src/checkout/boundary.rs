//! Server-side checks on checkout writes.
//!
//! Clients only declare what they did; these functions verify it against
//! the chain before anything is stored.

use alloy_primitives::Address;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::parse_address;
use super::{
    CheckoutError, CheckoutStore, ensure_not_subscribed, load_active_plan, onchain_plan_id,
    vault_record, vault_subscription, wallet_subscription,
};
use crate::entities::deposit_vaults::DepositVault;
use crate::entities::subscriptions::Subscription;
use crate::entities::{ActivationMode, SubscriptionStatus};
use crate::utils::utc_now;
use crate::web3::ContractGateway;
use crate::web3::amounts::to_token_units;

/// Record a subscription a client opened.
///
/// A wallet-mode subscription is stored `active` only if the engine already
/// reports it active on-chain and the subscriber has no other active wallet
/// subscription to the plan; its billing date is computed here. A
/// vault-mode subscription is stored `pending`. Either way the plan price
/// must be expressible in `token_decimals`.
pub async fn open_subscription<S, G>(
    store: &S,
    gateway: &G,
    plan_id: i64,
    subscriber: Address,
    mode: ActivationMode,
    token_decimals: u32,
) -> Result<Subscription, CheckoutError>
where
    S: CheckoutStore + ?Sized,
    G: ContractGateway + ?Sized,
{
    let plan = load_active_plan(store, plan_id).await?;
    to_token_units(plan.price, token_decimals)?;
    let record = match mode {
        ActivationMode::Wallet => {
            ensure_not_subscribed(store, plan_id, subscriber).await?;
            let active = gateway
                .is_subscription_active(subscriber, onchain_plan_id(plan_id)?)
                .await?;
            if !active {
                warn!(plan_id, %subscriber, "Wallet subscription is not active on-chain");
                return Err(CheckoutError::SubscriptionNotActiveOnChain);
            }
            wallet_subscription(&plan, subscriber, utc_now())
        }
        ActivationMode::Vault => vault_subscription(&plan, subscriber),
    };
    let subscription = store.insert_subscription(record).await?;
    info!(
        subscription_id = %subscription.id,
        plan_id,
        %subscriber,
        mode = ?mode,
        "Subscription opened"
    );
    Ok(subscription)
}

/// Record the vault a client derived for a pending vault-mode subscription.
///
/// The address is derived again here and must match. Attaching the same
/// vault twice returns the first record.
pub async fn attach_vault<S, G>(
    store: &S,
    gateway: &G,
    subscription_id: Uuid,
    claimed: Address,
) -> Result<DepositVault, CheckoutError>
where
    S: CheckoutStore + ?Sized,
    G: ContractGateway + ?Sized,
{
    let subscription = store
        .subscription(subscription_id)
        .await?
        .ok_or_else(|| CheckoutError::subscription_not_found(subscription_id))?;
    if subscription.activation_mode != ActivationMode::Vault {
        return Err(CheckoutError::NotVaultSubscription(subscription_id));
    }
    if subscription.status != SubscriptionStatus::Pending {
        return Err(CheckoutError::SubscriptionNotPending(subscription_id));
    }

    let plan = store
        .plan(subscription.plan_id)
        .await?
        .ok_or_else(|| CheckoutError::plan_not_found(subscription.plan_id))?;
    let subscriber = parse_address(&subscription.subscriber_address)?;
    let expected = gateway
        .deposit_address(subscriber, onchain_plan_id(plan.id)?)
        .await?;
    if expected != claimed {
        warn!(%subscription_id, %expected, %claimed, "Vault address mismatch");
        return Err(CheckoutError::VaultAddressMismatch { expected, claimed });
    }

    Ok(store
        .insert_vault(vault_record(&subscription, &plan, expected))
        .await?)
}

/// Cancel a subscription on behalf of its subscriber.
///
/// Cancelling twice returns the stored row unchanged.
pub async fn cancel_for_subscriber<S>(
    store: &S,
    subscription_id: Uuid,
    subscriber: Address,
) -> Result<Subscription, CheckoutError>
where
    S: CheckoutStore + ?Sized,
{
    let subscription = store
        .subscription(subscription_id)
        .await?
        .ok_or_else(|| CheckoutError::subscription_not_found(subscription_id))?;
    if parse_address(&subscription.subscriber_address)? != subscriber {
        return Err(CheckoutError::SubscriberMismatch(subscription_id));
    }
    if subscription.status == SubscriptionStatus::Cancelled {
        return Ok(subscription);
    }

    let cancelled = store
        .cancel_subscription(subscription_id)
        .await?
        .ok_or_else(|| CheckoutError::subscription_not_found(subscription_id))?;
    info!(%subscription_id, %subscriber, "Subscription cancelled");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MemoryStore, ScriptedGateway, monthly_plan};
    use super::*;
    use alloy_primitives::U256;

    fn gateway() -> ScriptedGateway {
        ScriptedGateway::new(Address::repeat_byte(0xee))
    }

    #[tokio::test]
    async fn test_wallet_subscription_requires_onchain_activation() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let subscriber = Address::repeat_byte(0x42);
        let chain = gateway();

        let err = open_subscription(&store, &chain, 7, subscriber, ActivationMode::Wallet, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::SubscriptionNotActiveOnChain));
        assert!(store.subscriptions().is_empty());

        chain.set_active_on_chain(true);
        let subscription =
            open_subscription(&store, &chain, 7, subscriber, ActivationMode::Wallet, 6)
                .await
                .unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert!(subscription.next_billing_at.is_some());

        let err = open_subscription(&store, &chain, 7, subscriber, ActivationMode::Wallet, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadySubscribed(id) if id == subscription.id));
        assert_eq!(store.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_over_precise_price_opens_nothing() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.9999999"));
        let err = open_subscription(
            &store,
            &gateway(),
            7,
            Address::repeat_byte(0x42),
            ActivationMode::Vault,
            6,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAmount(_)));
        assert!(store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_vault_subscription_opens_pending() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let subscription = open_subscription(
            &store,
            &gateway(),
            7,
            Address::repeat_byte(0x42),
            ActivationMode::Vault,
            6,
        )
        .await
        .unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Pending);
        assert_eq!(subscription.next_billing_at, None);
    }

    #[tokio::test]
    async fn test_attach_vault_checks_derivation() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let chain = gateway();
        let subscriber = Address::repeat_byte(0x42);
        let subscription =
            open_subscription(&store, &chain, 7, subscriber, ActivationMode::Vault, 6)
                .await
                .unwrap();

        let wrong = Address::repeat_byte(0x99);
        let err = attach_vault(&store, &chain, subscription.id, wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::VaultAddressMismatch { .. }));
        assert!(store.vaults().is_empty());

        let derived = ScriptedGateway::derive(subscriber, U256::from(7u64));
        let vault = attach_vault(&store, &chain, subscription.id, derived)
            .await
            .unwrap();
        assert_eq!(vault.vault_address, derived.to_string());
        let again = attach_vault(&store, &chain, subscription.id, derived)
            .await
            .unwrap();
        assert_eq!(again, vault);
        assert_eq!(store.vaults().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_vault_rejects_wallet_and_settled_subscriptions() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let chain = gateway();
        chain.set_active_on_chain(true);
        let subscriber = Address::repeat_byte(0x42);
        let derived = ScriptedGateway::derive(subscriber, U256::from(7u64));

        let wallet = open_subscription(&store, &chain, 7, subscriber, ActivationMode::Wallet, 6)
            .await
            .unwrap();
        assert!(matches!(
            attach_vault(&store, &chain, wallet.id, derived).await,
            Err(CheckoutError::NotVaultSubscription(_))
        ));

        let vault = open_subscription(&store, &chain, 7, subscriber, ActivationMode::Vault, 6)
            .await
            .unwrap();
        store.activate(vault.id);
        assert!(matches!(
            attach_vault(&store, &chain, vault.id, derived).await,
            Err(CheckoutError::SubscriptionNotPending(_))
        ));

        assert!(matches!(
            attach_vault(&store, &chain, Uuid::new_v4(), derived).await,
            Err(CheckoutError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_requires_matching_subscriber() {
        let store = MemoryStore::with_plan(monthly_plan(7, "9.99"));
        let subscriber = Address::repeat_byte(0x42);
        let subscription =
            open_subscription(&store, &gateway(), 7, subscriber, ActivationMode::Vault, 6)
                .await
                .unwrap();

        assert!(matches!(
            cancel_for_subscriber(&store, subscription.id, Address::repeat_byte(0x43)).await,
            Err(CheckoutError::SubscriberMismatch(_))
        ));

        let cancelled = cancel_for_subscriber(&store, subscription.id, subscriber)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        let again = cancel_for_subscriber(&store, subscription.id, subscriber)
            .await
            .unwrap();
        assert_eq!(again.cancelled_at, cancelled.cancelled_at);
    }
}
