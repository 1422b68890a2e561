//! Refill/overflow policy, mirroring `ethRefillContract.*`.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};

/// Vault refill policy. `None` at the `FaucetConfig` level means the refill
/// controller is disabled entirely.
#[derive(Debug, Clone)]
pub struct RefillConfig {
    pub contract: Address,
    pub abi: String,
    pub trigger_balance: U256,
    pub overflow_balance: Option<U256>,
    pub request_amount: U256,
    pub cooldown_time: u64,
    pub allowance_fn: Option<String>,
    pub allowance_fn_args: Vec<String>,
    pub withdraw_fn: String,
    pub withdraw_fn_args: Vec<String>,
    pub withdraw_gas_limit: u64,
    pub deposit_fn: Option<String>,
    pub deposit_fn_args: Vec<String>,
    pub check_contract_balance: Option<String>,
    pub contract_dust_balance: U256,
}

fn default_dust_balance() -> U256 {
    U256::from(1_000_000_000u64)
}

fn split_args(v: Option<String>) -> Vec<String> {
    v.map(|s| s.split(',').map(|a| a.trim().to_string()).filter(|a| !a.is_empty()).collect())
        .unwrap_or_default()
}

impl RefillConfig {
    /// `None` if `ETH_REFILL_CONTRACT` is unset — the refill controller is
    /// then never invoked (section 4.6: "invoked ... when
    /// `ethRefillContract` is configured").
    pub fn from_env() -> Result<Option<Self>> {
        let get = |name: &str| std::env::var(name).ok();
        let Some(contract) = get("ETH_REFILL_CONTRACT") else {
            return Ok(None);
        };
        let contract: Address = contract
            .parse()
            .with_context(|| "invalid ETH_REFILL_CONTRACT address")?;

        let abi = get("ETH_REFILL_ABI")
            .with_context(|| "ETH_REFILL_CONTRACT configured but ETH_REFILL_ABI is missing")?;
        let withdraw_fn = get("ETH_REFILL_WITHDRAW_FN").with_context(|| {
            "ETH_REFILL_CONTRACT configured but ETH_REFILL_WITHDRAW_FN is missing"
        })?;

        Ok(Some(Self {
            contract,
            abi,
            trigger_balance: get("ETH_REFILL_TRIGGER_BALANCE")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or(U256::ZERO),
            overflow_balance: get("ETH_REFILL_OVERFLOW_BALANCE")
                .and_then(|v| U256::from_str_radix(&v, 10).ok()),
            request_amount: get("ETH_REFILL_REQUEST_AMOUNT")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or(U256::ZERO),
            cooldown_time: get("ETH_REFILL_COOLDOWN_TIME")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            allowance_fn: get("ETH_REFILL_ALLOWANCE_FN"),
            allowance_fn_args: split_args(get("ETH_REFILL_ALLOWANCE_FN_ARGS")),
            withdraw_fn,
            withdraw_fn_args: split_args(get("ETH_REFILL_WITHDRAW_FN_ARGS")),
            withdraw_gas_limit: get("ETH_REFILL_WITHDRAW_GAS_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(200_000),
            deposit_fn: get("ETH_REFILL_DEPOSIT_FN"),
            deposit_fn_args: split_args(get("ETH_REFILL_DEPOSIT_FN_ARGS")),
            check_contract_balance: get("ETH_REFILL_CHECK_CONTRACT_BALANCE"),
            contract_dust_balance: get("ETH_REFILL_CONTRACT_DUST_BALANCE")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or_else(default_dust_balance),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_trims_and_drops_empties() {
        assert_eq!(
            split_args(Some(" {walletAddr} , {amount} ".to_string())),
            vec!["{walletAddr}".to_string(), "{amount}".to_string()]
        );
        assert_eq!(split_args(None), Vec::<String>::new());
    }
}
