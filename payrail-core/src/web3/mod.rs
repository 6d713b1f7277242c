//! On-chain access.
//!
//! - [`wallet`]: obtaining an account and a way to sign with it
//! - [`gateway`]: typed calls against the subscription engine and ERC-20
//!   tokens, bound to whatever signer the wallet provided
//! - [`amounts`]: decimal prices to token base units

pub mod amounts;
pub mod contracts;
pub mod gateway;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use alloy_primitives::{Address, TxHash, U256};
pub use gateway::{AllowanceOutcome, ContractGateway, EvmContractGateway, GatewayError};
pub use wallet::{
    DeclaredWalletConnector, LocalSignerConnector, RpcWalletConnector, WalletConnector,
    WalletError, WalletSession,
};

/// Plan ids are stored as `BIGINT` and passed on-chain as `uint256`.
pub fn plan_id_to_u256(plan_id: i64) -> Option<U256> {
    u64::try_from(plan_id).ok().map(U256::from)
}

/// A random address used as the subscriber of an anonymous vault checkout.
pub fn random_placeholder_address() -> Address {
    let bytes: [u8; 20] = rand::random();
    Address::from(bytes)
}
