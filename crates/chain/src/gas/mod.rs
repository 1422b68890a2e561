//! Gas pricing strategies: legacy (static gas price + query) vs EIP-1559
//! (fixed priority/max fee, no runtime query).
//!
//! The pricing model is a global configuration choice, not per-transaction:
//! the faucet picks one `GasStrategy` at startup from `ethLegacyTx` and uses
//! it for every claim payout and every refill/overflow transaction.

mod eip1559;
mod legacy;

pub use eip1559::Eip1559GasStrategy;
pub use legacy::LegacyGasStrategy;

use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;
use crate::provider::RpcClient;

/// Gas parameters resolved for one transaction.
#[derive(Debug, Clone, Copy)]
pub enum GasParams {
    Legacy { gas_price: u128 },
    Eip1559 { max_fee_per_gas: u128, max_priority_fee_per_gas: u128 },
}

/// A gas pricing strategy, selected once at startup from `ethLegacyTx`.
#[async_trait]
pub trait GasStrategy: Send + Sync + std::fmt::Debug {
    /// Resolve gas parameters for the next transaction. Legacy queries the
    /// node for the current gas price; EIP-1559 is static and never calls
    /// out to the node.
    async fn resolve(&self, client: &RpcClient) -> Result<GasParams>;

    /// Apply resolved parameters to a transaction request.
    fn apply(&self, tx: &mut TransactionRequest, params: GasParams);

    fn name(&self) -> &'static str;
}

/// Build the configured strategy.
///
/// `eth_tx_prio_fee` and `eth_tx_max_fee` are wei amounts from config.
/// `legacy` selects [`LegacyGasStrategy`]; otherwise [`Eip1559GasStrategy`].
pub fn build_gas_strategy(
    legacy: bool,
    eth_tx_prio_fee: u128,
    eth_tx_max_fee: u128,
) -> Box<dyn GasStrategy> {
    if legacy {
        Box::new(LegacyGasStrategy::new(eth_tx_prio_fee, eth_tx_max_fee))
    } else {
        Box::new(Eip1559GasStrategy::new(eth_tx_prio_fee, eth_tx_max_fee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_strategy_from_legacy_flag() {
        assert_eq!(build_gas_strategy(true, 1, 2).name(), "Legacy");
        assert_eq!(build_gas_strategy(false, 1, 2).name(), "EIP-1559");
    }
}
