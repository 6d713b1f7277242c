//! In-memory store and scripted chain for checkout tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, TxHash, U256, keccak256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::store::{CheckoutStore, StoreError};
use crate::entities::deposit_vaults::{DepositVault, InsertDepositVault};
use crate::entities::plans::Plan;
use crate::entities::subscriptions::{InsertSubscription, Subscription};
use crate::entities::{ActivationMode, BillingInterval, SubscriptionStatus, VaultStatus};
use crate::utils::utc_now;
use crate::web3::{
    AllowanceOutcome, ContractGateway, GatewayError, WalletConnector, WalletError, WalletSession,
};

pub fn monthly_plan(id: i64, price: &str) -> Plan {
    Plan {
        id,
        merchant_id: Uuid::from_u128(0x1234),
        name: "Pro".into(),
        price: Decimal::from_str(price).unwrap(),
        interval: BillingInterval::Monthly,
        token_address: Address::repeat_byte(0x05).to_string(),
        token_symbol: "USDC".into(),
        chain_id: 84532,
        active: true,
        created_at: utc_now(),
    }
}

#[derive(Default)]
struct StoreState {
    plans: HashMap<i64, Plan>,
    subscriptions: Vec<Subscription>,
    vaults: Vec<DepositVault>,
    fail_vault_insert: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn with_plan(plan: Plan) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().plans.insert(plan.id, plan);
        store
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn vaults(&self) -> Vec<DepositVault> {
        self.state.lock().unwrap().vaults.clone()
    }

    pub fn fail_next_vault_insert(&self) {
        self.state.lock().unwrap().fail_vault_insert = true;
    }

    /// What the vault watcher does after a sweep.
    pub fn activate(&self, subscription_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .unwrap();
        subscription.status = SubscriptionStatus::Active;
        subscription.next_billing_at = Some(utc_now() + time::Duration::days(30));
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>, StoreError> {
        Ok(self.state.lock().unwrap().plans.get(&plan_id).cloned())
    }

    async fn insert_subscription(
        &self,
        subscription: InsertSubscription,
    ) -> Result<Subscription, StoreError> {
        let row = Subscription {
            id: Uuid::now_v7(),
            plan_id: subscription.plan_id,
            subscriber_address: subscription.subscriber_address,
            status: subscription.status,
            activation_mode: subscription.activation_mode,
            next_billing_at: subscription.next_billing_at,
            created_at: utc_now(),
            cancelled_at: None,
        };
        self.state.lock().unwrap().subscriptions.push(row.clone());
        Ok(row)
    }

    async fn insert_vault(&self, vault: InsertDepositVault) -> Result<DepositVault, StoreError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_vault_insert) {
            return Err(StoreError::Remote("connection reset".into()));
        }
        if let Some(existing) = state
            .vaults
            .iter()
            .find(|v| v.subscription_id == vault.subscription_id)
        {
            return Ok(existing.clone());
        }
        let row = DepositVault {
            id: state.vaults.len() as i64 + 1,
            subscription_id: vault.subscription_id,
            vault_address: vault.vault_address,
            subscriber_address: vault.subscriber_address,
            plan_id: vault.plan_id,
            merchant_id: vault.merchant_id,
            status: VaultStatus::Pending,
            created_at: utc_now(),
            last_sweep_at: None,
        };
        state.vaults.push(row.clone());
        Ok(row)
    }

    async fn subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned())
    }

    async fn vault_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<DepositVault>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .vaults
            .iter()
            .find(|v| v.subscription_id == subscription_id)
            .cloned())
    }

    async fn active_wallet_subscription(
        &self,
        plan_id: i64,
        subscriber_address: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| {
                s.plan_id == plan_id
                    && s.subscriber_address == subscriber_address
                    && s.status == SubscriptionStatus::Active
                    && s.activation_mode == ActivationMode::Wallet
            })
            .cloned())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .map(|s| {
                s.status = SubscriptionStatus::Cancelled;
                s.cancelled_at = s.cancelled_at.or(Some(utc_now()));
                s.clone()
            }))
    }
}

/// Calls the scripted chain has seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayLog {
    pub allowance: U256,
    pub approvals: usize,
    pub subscribe_calls: usize,
    pub derivations: usize,
    pub active_on_chain: bool,
    pub balance: U256,
    pub deposits_processed: usize,
}

#[derive(Default)]
struct ChainState {
    log: GatewayLog,
    fail_subscribe: Option<GatewayError>,
}

#[derive(Clone)]
pub struct ScriptedGateway {
    engine: Address,
    signer: Option<Address>,
    chain: Arc<Mutex<ChainState>>,
}

impl ScriptedGateway {
    pub fn new(engine: Address) -> Self {
        Self {
            engine,
            signer: None,
            chain: Arc::default(),
        }
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.chain.lock().unwrap().log.allowance = allowance;
        self
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.chain.lock().unwrap().log.balance = balance;
        self
    }

    pub fn signed_by(&self, signer: Address) -> Self {
        Self {
            signer: Some(signer),
            ..self.clone()
        }
    }

    pub fn log(&self) -> GatewayLog {
        self.chain.lock().unwrap().log
    }

    pub fn fail_next_subscribe(&self, err: GatewayError) {
        self.chain.lock().unwrap().fail_subscribe = Some(err);
    }

    pub fn set_active_on_chain(&self, active: bool) {
        self.chain.lock().unwrap().log.active_on_chain = active;
    }

    /// Deterministic stand-in for the engine's vault derivation.
    pub fn derive(subscriber: Address, plan_id: U256) -> Address {
        let mut preimage = subscriber.to_vec();
        preimage.extend_from_slice(&plan_id.to_be_bytes::<32>());
        Address::from_slice(&keccak256(preimage)[12..])
    }
}

#[async_trait]
impl ContractGateway for ScriptedGateway {
    fn engine_address(&self) -> Address {
        self.engine
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    async fn deposit_address(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<Address, GatewayError> {
        self.chain.lock().unwrap().log.derivations += 1;
        Ok(Self::derive(subscriber, plan_id))
    }

    async fn is_subscription_active(
        &self,
        _subscriber: Address,
        _plan_id: U256,
    ) -> Result<bool, GatewayError> {
        Ok(self.chain.lock().unwrap().log.active_on_chain)
    }

    async fn ensure_allowance(
        &self,
        _token: Address,
        _spender: Address,
        amount: U256,
    ) -> Result<AllowanceOutcome, GatewayError> {
        self.signer.ok_or(GatewayError::SignerUnavailable)?;
        let mut chain = self.chain.lock().unwrap();
        if chain.log.allowance >= amount {
            return Ok(AllowanceOutcome::Sufficient);
        }
        chain.log.allowance = amount;
        chain.log.approvals += 1;
        Ok(AllowanceOutcome::Approved(TxHash::repeat_byte(0x01)))
    }

    async fn subscribe(&self, _plan_id: U256) -> Result<TxHash, GatewayError> {
        self.signer.ok_or(GatewayError::SignerUnavailable)?;
        let mut chain = self.chain.lock().unwrap();
        if let Some(err) = chain.fail_subscribe.take() {
            return Err(err);
        }
        chain.log.subscribe_calls += 1;
        chain.log.active_on_chain = true;
        Ok(TxHash::repeat_byte(0x02))
    }

    async fn token_balance(
        &self,
        _token: Address,
        _holder: Address,
    ) -> Result<U256, GatewayError> {
        Ok(self.chain.lock().unwrap().log.balance)
    }

    async fn process_deposit(
        &self,
        _subscriber: Address,
        _plan_id: U256,
    ) -> Result<TxHash, GatewayError> {
        self.signer.ok_or(GatewayError::SignerUnavailable)?;
        let mut chain = self.chain.lock().unwrap();
        chain.log.balance = U256::ZERO;
        chain.log.deposits_processed += 1;
        chain.log.active_on_chain = true;
        Ok(TxHash::repeat_byte(0x03))
    }
}

enum Account {
    Present(Address),
    Missing,
    Rejected,
}

pub struct ScriptedConnector {
    account: Account,
    gateway: ScriptedGateway,
}

impl ScriptedConnector {
    pub fn account(address: Address, gateway: ScriptedGateway) -> Self {
        Self {
            account: Account::Present(address),
            gateway,
        }
    }

    pub fn missing(gateway: ScriptedGateway) -> Self {
        Self {
            account: Account::Missing,
            gateway,
        }
    }

    pub fn rejecting(gateway: ScriptedGateway) -> Self {
        Self {
            account: Account::Rejected,
            gateway,
        }
    }
}

#[async_trait]
impl WalletConnector for ScriptedConnector {
    type Gateway = ScriptedGateway;

    fn read_only(&self) -> &ScriptedGateway {
        &self.gateway
    }

    async fn connect(&self) -> Result<WalletSession<ScriptedGateway>, WalletError> {
        match self.account {
            Account::Present(address) => Ok(WalletSession {
                address,
                gateway: self.gateway.signed_by(address),
            }),
            Account::Missing => Err(WalletError::NoWalletFound),
            Account::Rejected => Err(WalletError::UserRejected),
        }
    }
}
