//! Chain access configuration.

use alloy_primitives::Address;
use url::Url;

/// Default number of decimals of the payment token (USDC).
pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;

/// Where the subscription engine lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// JSON-RPC endpoint used for reads and for the sweeper's transactions.
    pub rpc_url: Url,
    /// EIP-155 chain id. New plans default to it.
    pub chain_id: u64,
    /// Address of the subscription engine contract.
    pub engine_address: Address,
    /// Decimals of the plan tokens; prices are scaled by `10^token_decimals`.
    pub token_decimals: u32,
}
