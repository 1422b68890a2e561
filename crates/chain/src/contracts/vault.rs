//! Dynamic ABI binding for the refill vault.
//!
//! Unlike [`super::erc20`], the vault's function names (`allowanceFn`,
//! `withdrawFn`, `depositFn`) and argument shapes are configuration, not
//! compile-time knowledge, so `sol!` cannot bind them. We parse the
//! configured ABI JSON once at startup and encode/decode calls against it
//! by function name.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;

use crate::error::{ChainError, Result};
use crate::provider::RpcClient;

/// A refill vault contract, bound to a parsed ABI rather than a `sol!`
/// interface.
pub struct VaultContract {
    pub address: Address,
    abi: JsonAbi,
}

impl VaultContract {
    pub fn new(address: Address, abi_json: &str) -> Result<Self> {
        let abi: JsonAbi =
            serde_json::from_str(abi_json).map_err(|e| ChainError::Abi(e.to_string()))?;
        Ok(Self { address, abi })
    }

    fn function(&self, name: &str) -> Result<&alloy::json_abi::Function> {
        self.abi
            .function(name)
            .and_then(|fns| fns.first())
            .ok_or_else(|| ChainError::Abi(format!("vault ABI has no function `{name}`")))
    }

    /// Encode calldata for `fn_name(args...)`.
    pub fn encode_call(&self, fn_name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        let func = self.function(fn_name)?;
        func.abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| ChainError::Abi(e.to_string()))
    }

    /// Call a read-only (view) function and decode its return values.
    pub async fn call_view(
        &self,
        client: &RpcClient,
        fn_name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let func = self.function(fn_name)?;
        let input = self.encode_call(fn_name, args)?;
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(input);
        let out = client.call(tx).await?;
        func.abi_decode_output(&out, false)
            .map_err(|e| ChainError::Abi(e.to_string()))
    }

    /// Build calldata for a state-mutating call (`withdrawFn`/`depositFn`);
    /// submission follows the same sign-and-broadcast path as a payout.
    pub fn encode_mutating_call(&self, fn_name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        self.encode_call(fn_name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITHDRAW_ABI: &str = r#"[
        {
            "type": "function",
            "name": "withdraw",
            "inputs": [
                {"name": "token", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "allowance",
            "inputs": [{"name": "wallet", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "view"
        }
    ]"#;

    #[test]
    fn encodes_call_for_configured_function_name() {
        let vault = VaultContract::new(Address::ZERO, WITHDRAW_ABI).unwrap();
        let data = vault
            .encode_call(
                "withdraw",
                &[
                    DynSolValue::Address(Address::repeat_byte(2)),
                    DynSolValue::Uint(alloy::primitives::U256::from(100u64), 256),
                ],
            )
            .unwrap();
        assert_eq!(&data[..4], &alloy::primitives::keccak256(b"withdraw(address,uint256)")[..4]);
    }

    #[test]
    fn unknown_function_name_is_an_error() {
        let vault = VaultContract::new(Address::ZERO, WITHDRAW_ABI).unwrap();
        assert!(vault.encode_call("nonexistent", &[]).is_err());
    }
}
