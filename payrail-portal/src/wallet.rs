//! Choosing how the portal signs.
//!
//! In order of preference: an external wallet reached over JSON-RPC, a
//! private key from the environment, or a declared address that can only
//! be used for vault checkouts and cancellation.

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use async_trait::async_trait;
use clap::Args;
use payrail_core::config::ChainConfig;
use payrail_core::web3::{
    DeclaredWalletConnector, EvmContractGateway, LocalSignerConnector, RpcWalletConnector,
    WalletConnector, WalletError, WalletSession,
};
use url::Url;

/// Wallet selection flags.
#[derive(Args, Debug, Clone, Default)]
pub struct WalletArgs {
    /// JSON-RPC endpoint of an external wallet (answers `eth_requestAccounts`)
    #[arg(long, env = "PAYRAIL_WALLET_RPC")]
    pub wallet_rpc: Option<Url>,

    /// Hex private key to sign with
    #[arg(long, env = "PAYRAIL_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Subscriber address, for commands that never sign
    #[arg(long)]
    pub address: Option<Address>,
}

impl WalletArgs {
    pub fn signer(&self) -> anyhow::Result<Option<PrivateKeySigner>> {
        self.private_key
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<PrivateKeySigner>()
                    .context("PAYRAIL_PRIVATE_KEY is not a valid private key")
            })
            .transpose()
    }

    /// The subscriber address without touching any wallet.
    pub fn known_address(&self) -> anyhow::Result<Option<Address>> {
        Ok(match self.address {
            Some(address) => Some(address),
            None => self.signer()?.map(|signer| signer.address()),
        })
    }
}

/// The wallet the portal was configured with.
pub enum PortalWallet {
    Rpc(RpcWalletConnector),
    Local(LocalSignerConnector),
    Declared(DeclaredWalletConnector),
}

impl PortalWallet {
    pub fn from_args(args: &WalletArgs, chain: &ChainConfig) -> anyhow::Result<Self> {
        if let Some(endpoint) = &args.wallet_rpc {
            return Ok(PortalWallet::Rpc(RpcWalletConnector::new(
                chain,
                Some(endpoint.clone()),
            )));
        }
        if let Some(signer) = args.signer()? {
            return Ok(PortalWallet::Local(LocalSignerConnector::new(
                chain,
                Some(signer),
            )));
        }
        Ok(PortalWallet::Declared(DeclaredWalletConnector::new(
            chain,
            args.address,
        )))
    }

    /// Whether `connect` can be expected to yield an account.
    pub fn is_configured(&self, args: &WalletArgs) -> bool {
        match self {
            PortalWallet::Rpc(_) | PortalWallet::Local(_) => true,
            PortalWallet::Declared(_) => args.address.is_some(),
        }
    }

    /// Whether the wallet can send transactions. A declared address cannot.
    pub fn can_sign(&self) -> bool {
        matches!(self, PortalWallet::Rpc(_) | PortalWallet::Local(_))
    }
}

#[async_trait]
impl WalletConnector for PortalWallet {
    type Gateway = EvmContractGateway;

    fn read_only(&self) -> &EvmContractGateway {
        match self {
            PortalWallet::Rpc(connector) => connector.read_only(),
            PortalWallet::Local(connector) => connector.read_only(),
            PortalWallet::Declared(connector) => connector.read_only(),
        }
    }

    async fn connect(&self) -> Result<WalletSession<EvmContractGateway>, WalletError> {
        match self {
            PortalWallet::Rpc(connector) => connector.connect().await,
            PortalWallet::Local(connector) => connector.connect().await,
            PortalWallet::Declared(connector) => connector.connect().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn chain() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
            chain_id: 31337,
            engine_address: Address::repeat_byte(0x11),
            token_decimals: 6,
        }
    }

    #[tokio::test]
    async fn test_private_key_wallet_signs_as_its_address() {
        let args = WalletArgs {
            private_key: Some(ANVIL_KEY.into()),
            ..WalletArgs::default()
        };
        let wallet = PortalWallet::from_args(&args, &chain()).unwrap();
        assert!(matches!(wallet, PortalWallet::Local(_)));

        let session = wallet.connect().await.unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(session.address, expected);
        assert_eq!(args.known_address().unwrap(), Some(expected));
    }

    #[test]
    fn test_wallet_rpc_takes_precedence() {
        let args = WalletArgs {
            wallet_rpc: Some("http://127.0.0.1:1248".parse().unwrap()),
            private_key: Some(ANVIL_KEY.into()),
            address: None,
        };
        assert!(matches!(
            PortalWallet::from_args(&args, &chain()).unwrap(),
            PortalWallet::Rpc(_)
        ));
    }

    #[tokio::test]
    async fn test_without_any_wallet_connect_finds_none() {
        let args = WalletArgs::default();
        let wallet = PortalWallet::from_args(&args, &chain()).unwrap();
        assert!(!wallet.is_configured(&args));
        assert!(matches!(
            wallet.connect().await,
            Err(WalletError::NoWalletFound)
        ));
    }

    #[test]
    fn test_declared_address_cannot_sign() {
        let args = WalletArgs {
            address: Some(Address::repeat_byte(0x42)),
            ..WalletArgs::default()
        };
        let wallet = PortalWallet::from_args(&args, &chain()).unwrap();
        assert!(wallet.is_configured(&args));
        assert!(!wallet.can_sign());

        let signing = WalletArgs {
            private_key: Some(ANVIL_KEY.into()),
            ..args
        };
        assert!(PortalWallet::from_args(&signing, &chain()).unwrap().can_sign());
    }

    #[test]
    fn test_bad_private_key_is_reported() {
        let args = WalletArgs {
            private_key: Some("0x1234".into()),
            ..WalletArgs::default()
        };
        assert!(args.signer().is_err());
    }
}
