//! ERC20 token contract bindings.
//!
//! Both supported currencies (USDT and ePound on BSC) expose the same
//! BEP20/ERC20 surface, so a single interface serves them.

use alloy_sol_types::sol;

sol! {
    /// ERC20 token interface as deployed for the supported currencies
    #[sol(rpc)]
    interface IERC20 {
        /// Emitted when tokens move between accounts
        event Transfer(
            address indexed from,
            address indexed to,
            uint256 value
        );

        /// Emitted when `owner` sets the allowance of `spender`
        event Approval(
            address indexed owner,
            address indexed spender,
            uint256 value
        );

        /// Amount `spender` may still move on behalf of `owner`
        function allowance(address owner, address spender) external view returns (uint256);

        /// Set the allowance of `spender` to `amount` (zero revokes)
        function approve(address spender, uint256 amount) external returns (bool);

        function balanceOf(address account) external view returns (uint256);

        function name() external view returns (string memory);

        function symbol() external view returns (string memory);

        function decimals() external view returns (uint8);

        function totalSupply() external view returns (uint256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use alloy_sol_types::SolCall;

    #[test]
    fn test_approve_selector() {
        // keccak256("approve(address,uint256)")[..4]
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_allowance_calldata_layout() {
        let owner = address!("1111111111111111111111111111111111111111");
        let spender = address!("2222222222222222222222222222222222222222");
        let data = IERC20::allowanceCall { owner, spender }.abi_encode();

        assert_eq!(&data[..4], &[0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(data.len(), 4 + 32 * 2);
        assert_eq!(&data[16..36], owner.as_slice());
        assert_eq!(&data[48..68], spender.as_slice());
    }

    #[test]
    fn test_approve_max_encodes_all_ones() {
        let call = IERC20::approveCall {
            spender: address!("2222222222222222222222222222222222222222"),
            amount: U256::MAX,
        };
        let data = call.abi_encode();
        assert!(data[36..68].iter().all(|b| *b == 0xff));
    }
}
