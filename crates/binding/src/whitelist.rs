//! Whitelist registry contract bindings.
//!
//! One whitelist contract is deployed per currency. It is the spender the user
//! approves on the token, and it keeps the set of registered addresses.
//!
//! Note: the registration entrypoint is spelled `whitlistAddress` on-chain and
//! must stay that way for the selector to match.

use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    interface IWhitelist {
        /// Emitted when an address joins the whitelist
        event UserRegistered(address indexed user);

        event OwnershipTransferred(
            address indexed previousOwner,
            address indexed newOwner
        );

        /// Register `_user` on the whitelist
        function whitlistAddress(address _user) external;

        /// Whether `_user` is registered
        function checkIfRegistered(address _user) external view returns (bool);

        /// Public registry mapping backing `checkIfRegistered`
        function isRegistered(address) external view returns (bool);

        function totalRegistered() external view returns (uint256);

        function getAllRegistered() external view returns (address[] memory);

        function registeredUsers(uint256) external view returns (address);

        /// Token balance of `_user` as seen by the whitelist contract
        function checkbalance(address _user) external view returns (uint256);

        /// Allowance granted by `_user` to the whitelist contract
        function checkAllowance(address _user) external view returns (uint256);

        function getTotalExtractableTokens() external view returns (uint256 total);

        function owner() external view returns (address);

        function platformWallet() external view returns (address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Address};
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn test_whitelist_call_encodes_user() {
        let user = address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1");
        let data = IWhitelist::whitlistAddressCall { _user: user }.abi_encode();

        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[16..], user.as_slice());
    }

    #[test]
    fn test_registration_reads_share_argument_layout() {
        let user = Address::repeat_byte(7);
        let check = IWhitelist::checkIfRegisteredCall { _user: user }.abi_encode();
        let mapping = IWhitelist::isRegisteredCall(user).abi_encode();

        assert_ne!(check[..4], mapping[..4]);
        assert_eq!(check[4..], mapping[4..]);
    }

    #[test]
    fn test_user_registered_signature() {
        assert_eq!(
            IWhitelist::UserRegistered::SIGNATURE,
            "UserRegistered(address)"
        );
    }
}
