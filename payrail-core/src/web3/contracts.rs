//! Solidity interface definitions for the subscription engine and the
//! payment tokens.

use alloy_sol_types::sol;

sol! {
    /// The subscription engine.
    ///
    /// `getDepositAddress` is a pure function of `(user, planId)`; it is the
    /// only source of deposit vault addresses.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ISubscriptionEngine {
        function getDepositAddress(address user, uint256 planId) external view returns (address);
        function subscribe(uint256 planId) external;
        function isSubscriptionActive(address user, uint256 planId) external view returns (bool);
        function createPlan(address token, uint256 price, uint256 interval) external;
        function processDeposit(address user, uint256 planId) external;
    }

    /// Minimal ERC-20 interface for allowance, approval and balance checks.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}
