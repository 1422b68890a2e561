//! Typed ERC-20 binding used when `faucetCoinType = "erc20"`.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::{ChainError, Result};
use crate::provider::RpcClient;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// A faucet-distributed ERC-20 token. `decimals` is populated lazily by the
/// caller (wallet-state reconciliation), not fetched eagerly here.
#[derive(Debug, Clone, Copy)]
pub struct Erc20Token {
    pub address: Address,
}

impl Erc20Token {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub async fn balance_of(&self, client: &RpcClient, holder: Address) -> Result<U256> {
        let call = IERC20::balanceOfCall { account: holder };
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(call.abi_encode()));
        let out = client.call(tx).await?;
        IERC20::balanceOfCall::abi_decode_returns(&out, false)
            .map(|ret| ret._0)
            .map_err(|e| ChainError::Abi(e.to_string()))
    }

    pub async fn decimals(&self, client: &RpcClient) -> Result<u8> {
        let call = IERC20::decimalsCall {};
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(call.abi_encode()));
        let out = client.call(tx).await?;
        IERC20::decimalsCall::abi_decode_returns(&out, false)
            .map(|ret| ret._0)
            .map_err(|e| ChainError::Abi(e.to_string()))
    }

    /// Calldata for `transfer(to, amount)`, used as the payout transaction's
    /// `data` field in token mode (with `value = 0`).
    pub fn transfer_calldata(&self, to: Address, amount: U256) -> Bytes {
        let call = IERC20::transferCall { to, amount };
        Bytes::from(call.abi_encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_calldata_starts_with_selector() {
        let token = Erc20Token::new(Address::ZERO);
        let data = token.transfer_calldata(Address::repeat_byte(1), U256::from(1_000u64));
        assert_eq!(&data[..4], &IERC20::transferCall::SELECTOR);
    }
}
