//! Wallet Connector.
//!
//! A connector hands out a [`WalletSession`]: the active account plus a
//! [`ContractGateway`] that signs as that account. Sessions live in memory
//! only; nothing about a wallet is persisted.
//!
//! Three connectors exist:
//!
//! - [`RpcWalletConnector`]: an EIP-1193 wallet reachable over JSON-RPC
//!   (a browser-extension bridge or a desktop wallet's local endpoint).
//!   The wallet signs every transaction itself.
//! - [`LocalSignerConnector`]: a private key held by this process.
//! - [`DeclaredWalletConnector`]: an address the subscriber told us about,
//!   without any signing capability. Used server-side.

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::gateway::{ContractGateway, EvmContractGateway, USER_REJECTED_CODE};
use crate::config::ChainConfig;

/// Errors returned while connecting a wallet.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet is installed, configured, or reachable.
    #[error("no wallet found")]
    NoWalletFound,

    /// The user refused to share an account.
    #[error("wallet connection rejected by user")]
    UserRejected,

    /// The wallet answered with something other than accounts or a refusal.
    #[error("wallet error: {0}")]
    Network(String),
}

impl From<TransportError> for WalletError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) if payload.code == USER_REJECTED_CODE => WalletError::UserRejected,
            Some(payload) => WalletError::Network(payload.message.to_string()),
            // The endpoint could not be reached at all.
            None => WalletError::NoWalletFound,
        }
    }
}

/// A connected account and the gateway that signs as it.
#[derive(Debug, Clone)]
pub struct WalletSession<G> {
    pub address: Address,
    pub gateway: G,
}

/// Obtains wallet sessions.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    type Gateway: ContractGateway;

    /// Gateway for view calls, usable before any wallet is connected.
    fn read_only(&self) -> &Self::Gateway;

    /// Request account access.
    async fn connect(&self) -> Result<WalletSession<Self::Gateway>, WalletError>;
}

fn chain_reader(chain: &ChainConfig) -> EvmContractGateway {
    let provider = ProviderBuilder::new().connect_http(chain.rpc_url.clone());
    EvmContractGateway::read_only(DynProvider::new(provider), chain.engine_address)
}

/// Connects to an EIP-1193 wallet over JSON-RPC.
///
/// Account access is requested with `eth_requestAccounts`; transactions are
/// sent unsigned with `eth_sendTransaction` and the wallet prompts its user.
pub struct RpcWalletConnector {
    endpoint: Option<Url>,
    engine: Address,
    reader: EvmContractGateway,
}

impl RpcWalletConnector {
    /// `endpoint` is `None` when the user has no wallet configured.
    pub fn new(chain: &ChainConfig, endpoint: Option<Url>) -> Self {
        Self {
            endpoint,
            engine: chain.engine_address,
            reader: chain_reader(chain),
        }
    }
}

#[async_trait]
impl WalletConnector for RpcWalletConnector {
    type Gateway = EvmContractGateway;

    fn read_only(&self) -> &EvmContractGateway {
        &self.reader
    }

    async fn connect(&self) -> Result<WalletSession<EvmContractGateway>, WalletError> {
        let Some(endpoint) = &self.endpoint else {
            return Err(WalletError::NoWalletFound);
        };
        debug!(%endpoint, "Requesting wallet accounts");

        let provider = ProviderBuilder::new().connect_http(endpoint.clone());
        let accounts: Vec<Address> = provider
            .raw_request("eth_requestAccounts".into(), Vec::<String>::new())
            .await?;
        let address = *accounts.first().ok_or(WalletError::UserRejected)?;

        info!(%address, "Wallet connected");
        Ok(WalletSession {
            address,
            gateway: EvmContractGateway::with_signer(
                DynProvider::new(provider),
                self.engine,
                address,
            ),
        })
    }
}

/// Signs with a private key held by this process.
pub struct LocalSignerConnector {
    rpc_url: Url,
    engine: Address,
    signer: Option<PrivateKeySigner>,
    reader: EvmContractGateway,
}

impl LocalSignerConnector {
    pub fn new(chain: &ChainConfig, signer: Option<PrivateKeySigner>) -> Self {
        Self {
            rpc_url: chain.rpc_url.clone(),
            engine: chain.engine_address,
            signer,
            reader: chain_reader(chain),
        }
    }
}

#[async_trait]
impl WalletConnector for LocalSignerConnector {
    type Gateway = EvmContractGateway;

    fn read_only(&self) -> &EvmContractGateway {
        &self.reader
    }

    async fn connect(&self) -> Result<WalletSession<EvmContractGateway>, WalletError> {
        let signer = self.signer.clone().ok_or(WalletError::NoWalletFound)?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone());
        Ok(WalletSession {
            address,
            gateway: EvmContractGateway::with_signer(
                DynProvider::new(provider),
                self.engine,
                address,
            ),
        })
    }
}

/// An address declared by the subscriber. It can be used to derive vaults
/// and check on-chain state, never to sign.
pub struct DeclaredWalletConnector {
    address: Option<Address>,
    reader: EvmContractGateway,
}

impl DeclaredWalletConnector {
    pub fn new(chain: &ChainConfig, address: Option<Address>) -> Self {
        Self {
            address,
            reader: chain_reader(chain),
        }
    }
}

#[async_trait]
impl WalletConnector for DeclaredWalletConnector {
    type Gateway = EvmContractGateway;

    fn read_only(&self) -> &EvmContractGateway {
        &self.reader
    }

    async fn connect(&self) -> Result<WalletSession<EvmContractGateway>, WalletError> {
        let address = self.address.ok_or(WalletError::NoWalletFound)?;
        Ok(WalletSession {
            address,
            gateway: self.reader.clone(),
        })
    }
}
