//! Contract Gateway.
//!
//! Typed calls against the subscription engine and ERC-20 tokens. View
//! calls work without a signer; state-changing calls need the gateway to be
//! bound to a connected wallet and wait for the transaction receipt before
//! returning. Nothing here retries: a failed call is reported to the caller
//! as-is.

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{DynProvider, PendingTransactionError, Provider};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use alloy_transport::TransportError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::contracts::{IERC20, ISubscriptionEngine};

/// JSON-RPC error code an EIP-1193 wallet returns when the user declines.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors returned by the Contract Gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The signer declined to sign the transaction.
    #[error("transaction rejected by signer")]
    TransactionRejected,

    /// The transaction was mined (or simulated) and reverted.
    #[error("transaction reverted{}", .tx_hash.map(|h| format!(" ({h})")).unwrap_or_default())]
    TransactionReverted { tx_hash: Option<TxHash> },

    /// The RPC endpoint could not be reached or returned an unusable answer.
    #[error("network error: {0}")]
    Network(String),

    /// A state-changing call was made on a read-only gateway.
    #[error("no signer is connected")]
    SignerUnavailable,
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        if let Some(payload) = err.as_error_resp() {
            if payload.code == USER_REJECTED_CODE {
                return GatewayError::TransactionRejected;
            }
            if payload.message.contains("revert") {
                return GatewayError::TransactionReverted { tx_hash: None };
            }
        }
        GatewayError::Network(err.to_string())
    }
}

impl From<alloy_contract::Error> for GatewayError {
    fn from(err: alloy_contract::Error) -> Self {
        match err {
            alloy_contract::Error::TransportError(e) => e.into(),
            other => GatewayError::Network(other.to_string()),
        }
    }
}

impl From<PendingTransactionError> for GatewayError {
    fn from(err: PendingTransactionError) -> Self {
        GatewayError::Network(err.to_string())
    }
}

/// What [`ContractGateway::ensure_allowance`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// The existing allowance already covered the amount.
    Sufficient,
    /// An `approve` transaction was submitted and confirmed.
    Approved(TxHash),
}

/// Typed access to the subscription engine and its payment tokens.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// The subscription engine this gateway is bound to.
    fn engine_address(&self) -> Address;

    /// The account that signs state-changing calls, if any.
    fn signer_address(&self) -> Option<Address>;

    /// Deterministic deposit vault address for `(subscriber, plan_id)`.
    ///
    /// View call; needs no approval or signer.
    async fn deposit_address(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<Address, GatewayError>;

    /// Whether the engine considers the subscription active.
    async fn is_subscription_active(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<bool, GatewayError>;

    /// Make sure `spender` may pull at least `amount` of `token` from the
    /// signer. Submits `approve(spender, amount)` and waits for it only when
    /// the current allowance is lower.
    async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<AllowanceOutcome, GatewayError>;

    /// Submit `subscribe(plan_id)` and wait for the receipt.
    async fn subscribe(&self, plan_id: U256) -> Result<TxHash, GatewayError>;

    /// ERC-20 balance of `holder`.
    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, GatewayError>;

    /// Submit `processDeposit(subscriber, plan_id)`, sweeping a funded vault.
    async fn process_deposit(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<TxHash, GatewayError>;
}

/// [`ContractGateway`] over an alloy provider.
///
/// The provider decides how transactions get signed: a local key through a
/// wallet filler, or an external wallet answering `eth_sendTransaction`.
#[derive(Clone)]
pub struct EvmContractGateway {
    provider: DynProvider,
    engine: Address,
    signer: Option<Address>,
}

impl std::fmt::Debug for EvmContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmContractGateway")
            .field("engine", &self.engine)
            .field("signer", &self.signer)
            .finish()
    }
}

impl EvmContractGateway {
    /// A gateway that can only make view calls.
    pub fn read_only(provider: DynProvider, engine: Address) -> Self {
        Self {
            provider,
            engine,
            signer: None,
        }
    }

    /// A gateway whose transactions are sent from `signer`.
    pub fn with_signer(provider: DynProvider, engine: Address, signer: Address) -> Self {
        Self {
            provider,
            engine,
            signer: Some(signer),
        }
    }

    fn require_signer(&self) -> Result<Address, GatewayError> {
        self.signer.ok_or(GatewayError::SignerUnavailable)
    }

    /// Send a transaction and wait until it is mined.
    async fn send_and_confirm(
        &self,
        from: Address,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<TxHash, GatewayError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(calldata);

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, %to, "Transaction submitted, waiting for receipt");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            warn!(%tx_hash, %to, "Transaction reverted");
            return Err(GatewayError::TransactionReverted {
                tx_hash: Some(tx_hash),
            });
        }
        Ok(receipt.transaction_hash)
    }
}

#[async_trait]
impl ContractGateway for EvmContractGateway {
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
        let engine = ISubscriptionEngine::new(self.engine, self.provider.clone());
        let vault = engine.getDepositAddress(subscriber, plan_id).call().await?;
        Ok(vault)
    }

    async fn is_subscription_active(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<bool, GatewayError> {
        let engine = ISubscriptionEngine::new(self.engine, self.provider.clone());
        let active = engine
            .isSubscriptionActive(subscriber, plan_id)
            .call()
            .await?;
        Ok(active)
    }

    async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<AllowanceOutcome, GatewayError> {
        let owner = self.require_signer()?;
        let erc20 = IERC20::new(token, self.provider.clone());
        let current = erc20.allowance(owner, spender).call().await?;
        if current >= amount {
            debug!(%owner, %spender, %current, %amount, "Allowance already sufficient");
            return Ok(AllowanceOutcome::Sufficient);
        }

        info!(%owner, %spender, %current, %amount, "Requesting token approval");
        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        let tx_hash = self.send_and_confirm(owner, token, calldata).await?;
        Ok(AllowanceOutcome::Approved(tx_hash))
    }

    async fn subscribe(&self, plan_id: U256) -> Result<TxHash, GatewayError> {
        let from = self.require_signer()?;
        let calldata = ISubscriptionEngine::subscribeCall { planId: plan_id }.abi_encode();
        let tx_hash = self.send_and_confirm(from, self.engine, calldata).await?;
        info!(%from, %plan_id, %tx_hash, "Subscribed on-chain");
        Ok(tx_hash)
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, GatewayError> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let balance = erc20.balanceOf(holder).call().await?;
        Ok(balance)
    }

    async fn process_deposit(
        &self,
        subscriber: Address,
        plan_id: U256,
    ) -> Result<TxHash, GatewayError> {
        let from = self.require_signer()?;
        let calldata = ISubscriptionEngine::processDepositCall {
            user: subscriber,
            planId: plan_id,
        }
        .abi_encode();
        let tx_hash = self.send_and_confirm(from, self.engine, calldata).await?;
        info!(%subscriber, %plan_id, %tx_hash, "Vault deposit processed");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web3::testing::{
        JsonRpcReply, address_word, node_provider, receipt, rpc_method, uint_word,
    };
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENGINE: Address = Address::repeat_byte(0xee);
    const TOKEN: Address = Address::repeat_byte(0x05);
    const OWNER: Address = Address::repeat_byte(0x42);

    fn signing(server: &MockServer) -> EvmContractGateway {
        EvmContractGateway::with_signer(node_provider(server), ENGINE, OWNER)
    }

    async fn reply(server: &MockServer, rpc: &str, reply: JsonRpcReply) {
        rpc_method(rpc).respond_with(reply).mount(server).await;
    }

    #[tokio::test]
    async fn test_sufficient_allowance_sends_no_approval() {
        let server = MockServer::start().await;
        rpc_method("eth_call")
            .respond_with(JsonRpcReply::Result(uint_word(U256::from(9_990_000u64))))
            .expect(1)
            .mount(&server)
            .await;
        rpc_method("eth_sendTransaction")
            .respond_with(JsonRpcReply::Result(serde_json::json!(TxHash::ZERO)))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = signing(&server)
            .ensure_allowance(TOKEN, ENGINE, U256::from(9_990_000u64))
            .await
            .unwrap();
        assert_eq!(outcome, AllowanceOutcome::Sufficient);
    }

    #[tokio::test]
    async fn test_short_allowance_is_approved_and_confirmed() {
        let server = MockServer::start().await;
        let tx_hash = TxHash::repeat_byte(0xab);
        reply(
            &server,
            "eth_call",
            JsonRpcReply::Result(uint_word(U256::from(1_000_000u64))),
        )
        .await;
        rpc_method("eth_sendTransaction")
            .respond_with(JsonRpcReply::Result(serde_json::json!(tx_hash)))
            .expect(1)
            .mount(&server)
            .await;
        reply(
            &server,
            "eth_getTransactionReceipt",
            JsonRpcReply::Result(receipt(tx_hash, OWNER, TOKEN, true)),
        )
        .await;

        let gateway = signing(&server);
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            gateway.ensure_allowance(TOKEN, ENGINE, U256::from(9_990_000u64)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome, AllowanceOutcome::Approved(tx_hash));
    }

    #[tokio::test]
    async fn test_signer_rejection_maps_to_rejected() {
        let server = MockServer::start().await;
        reply(
            &server,
            "eth_sendTransaction",
            JsonRpcReply::Error {
                code: USER_REJECTED_CODE,
                message: "User denied transaction signature.",
            },
        )
        .await;

        let err = signing(&server).subscribe(U256::from(7u64)).await.unwrap_err();
        assert!(matches!(err, GatewayError::TransactionRejected));
    }

    #[tokio::test]
    async fn test_failed_receipt_maps_to_reverted_with_hash() {
        let server = MockServer::start().await;
        let tx_hash = TxHash::repeat_byte(0xcd);
        reply(
            &server,
            "eth_sendTransaction",
            JsonRpcReply::Result(serde_json::json!(tx_hash)),
        )
        .await;
        reply(
            &server,
            "eth_getTransactionReceipt",
            JsonRpcReply::Result(receipt(tx_hash, OWNER, ENGINE, false)),
        )
        .await;

        let gateway = signing(&server);
        let err = tokio::time::timeout(Duration::from_secs(10), gateway.subscribe(U256::from(7u64)))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::TransactionReverted { tx_hash: Some(hash) } if hash == tx_hash
        ));
    }

    #[tokio::test]
    async fn test_reverted_view_call_maps_to_reverted() {
        let server = MockServer::start().await;
        reply(
            &server,
            "eth_call",
            JsonRpcReply::Error {
                code: 3,
                message: "execution reverted",
            },
        )
        .await;

        let err = signing(&server)
            .deposit_address(OWNER, U256::from(7u64))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TransactionReverted { tx_hash: None }));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = signing(&server)
            .is_subscription_active(OWNER, U256::from(7u64))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
    }

    #[tokio::test]
    async fn test_deposit_address_decodes_engine_answer() {
        let server = MockServer::start().await;
        let vault = Address::repeat_byte(0x77);
        reply(&server, "eth_call", JsonRpcReply::Result(address_word(vault))).await;

        let gateway = EvmContractGateway::read_only(node_provider(&server), ENGINE);
        assert_eq!(
            gateway.deposit_address(OWNER, U256::from(7u64)).await.unwrap(),
            vault
        );
    }

    #[tokio::test]
    async fn test_read_only_gateway_cannot_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = EvmContractGateway::read_only(node_provider(&server), ENGINE);
        assert!(matches!(
            gateway.subscribe(U256::from(7u64)).await,
            Err(GatewayError::SignerUnavailable)
        ));
        assert!(matches!(
            gateway
                .ensure_allowance(TOKEN, ENGINE, U256::from(1u64))
                .await,
            Err(GatewayError::SignerUnavailable)
        ));
    }

    #[test]
    fn test_reverted_display_includes_hash() {
        let err = GatewayError::TransactionReverted {
            tx_hash: Some(TxHash::repeat_byte(0xab)),
        };
        assert!(err.to_string().starts_with("transaction reverted (0xabab"));
        let err = GatewayError::TransactionReverted { tx_hash: None };
        assert_eq!(err.to_string(), "transaction reverted");
    }

    #[test]
    fn test_approve_calldata_selector() {
        let calldata = IERC20::approveCall {
            spender: Address::ZERO,
            amount: U256::from(9_990_000u64),
        }
        .abi_encode();
        // approve(address,uint256)
        assert_eq!(&calldata[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(calldata.len(), 4 + 32 * 2);
    }
}
