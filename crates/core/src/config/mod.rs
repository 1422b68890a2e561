//! Typed configuration tree, loaded from environment variables via
//! `dotenvy`-populated `std::env`. Mirrors the teacher's layered config
//! idiom (sub-structs with documented defaults, assembled by one loader
//! function) but sources scalars from env vars rather than a TOML file, per
//! the faucet's configuration surface.

mod refill;

pub use refill::RefillConfig;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};

/// Coin type the faucet pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoinType {
    #[default]
    Native,
    Erc20,
}

/// Gas envelope and node connection options.
#[derive(Debug, Clone)]
pub struct EthConfig {
    pub rpc_host: String,
    pub chain_id: Option<u64>,
    pub wallet_key: String,
    pub legacy_tx: bool,
    pub tx_gas_limit: u64,
    pub tx_max_fee: u128,
    pub tx_prio_fee: u128,
    pub max_pending: usize,
    pub queue_no_funds: bool,
    pub spare_funds_amount: U256,
}

fn default_gas_limit() -> u64 {
    100_000
}
fn default_max_pending() -> usize {
    12
}

/// Status-publisher thresholds and messages.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub no_funds_balance: U256,
    pub low_funds_balance: U256,
    pub low_funds_warning: Option<String>,
    pub no_funds_error: Option<String>,
    pub rpc_connection_error: Option<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            no_funds_balance: U256::ZERO,
            low_funds_balance: U256::ZERO,
            low_funds_warning: None,
            no_funds_error: None,
            rpc_connection_error: None,
        }
    }
}

/// Faucet coin identity.
#[derive(Debug, Clone, Default)]
pub struct CoinConfig {
    pub coin_type: CoinType,
    pub coin_contract: Option<Address>,
    pub coin_symbol: Option<String>,
}

/// The fully resolved configuration tree, assembled once at startup.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    pub eth: EthConfig,
    pub status: StatusConfig,
    pub coin: CoinConfig,
    pub refill: Option<RefillConfig>,
}

impl FaucetConfig {
    /// Load from environment variables. `ETH_RPC_HOST` and `ETH_WALLET_KEY`
    /// are required; everything else falls back to a documented default.
    pub fn from_env() -> Result<Self> {
        let get = |name: &str| std::env::var(name).ok();
        let require =
            |name: &str| std::env::var(name).with_context(|| format!("missing env var: {name}"));

        let eth = EthConfig {
            rpc_host: require("ETH_RPC_HOST")?,
            chain_id: get("ETH_CHAIN_ID").and_then(|v| v.parse().ok()),
            wallet_key: require("ETH_WALLET_KEY")?,
            legacy_tx: parse_bool(get("ETH_LEGACY_TX")),
            tx_gas_limit: get("ETH_TX_GAS_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_gas_limit),
            tx_max_fee: get("ETH_TX_MAX_FEE").and_then(|v| v.parse().ok()).unwrap_or(0),
            tx_prio_fee: get("ETH_TX_PRIO_FEE").and_then(|v| v.parse().ok()).unwrap_or(0),
            max_pending: get("ETH_MAX_PENDING")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_pending),
            queue_no_funds: parse_bool(get("ETH_QUEUE_NO_FUNDS")),
            spare_funds_amount: get("SPARE_FUNDS_AMOUNT")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or(U256::ZERO),
        };

        let status = StatusConfig {
            no_funds_balance: get("NO_FUNDS_BALANCE")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or(U256::ZERO),
            low_funds_balance: get("LOW_FUNDS_BALANCE")
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or(U256::ZERO),
            low_funds_warning: get("LOW_FUNDS_WARNING"),
            no_funds_error: get("NO_FUNDS_ERROR"),
            rpc_connection_error: get("RPC_CONNECTION_ERROR"),
        };

        let coin_type = match get("FAUCET_COIN_TYPE").as_deref() {
            Some("erc20") => CoinType::Erc20,
            _ => CoinType::Native,
        };
        let coin = CoinConfig {
            coin_type,
            coin_contract: get("FAUCET_COIN_CONTRACT").and_then(|v| v.parse().ok()),
            coin_symbol: get("FAUCET_COIN_SYMBOL"),
        };

        let refill = RefillConfig::from_env()?;

        Ok(Self {
            eth,
            status,
            coin,
            refill,
        })
    }
}

fn parse_bool(v: Option<String>) -> bool {
    matches!(v.as_deref(), Some("1") | Some("true") | Some("TRUE") | Some("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_truthy_spellings() {
        assert!(parse_bool(Some("true".into())));
        assert!(parse_bool(Some("1".into())));
        assert!(!parse_bool(Some("false".into())));
        assert!(!parse_bool(None));
    }
}
