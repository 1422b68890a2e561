//! Legacy gas pricing: query the node's current gas price, add the
//! configured priority fee, then cap at the configured max fee (if set).

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use super::{GasParams, GasStrategy};
use crate::error::Result;
use crate::provider::RpcClient;

#[derive(Debug)]
pub struct LegacyGasStrategy {
    prio_fee: u128,
    max_fee: u128,
}

impl LegacyGasStrategy {
    pub fn new(prio_fee: u128, max_fee: u128) -> Self {
        Self { prio_fee, max_fee }
    }

    fn cap(&self, gas_price: u128) -> u128 {
        let priced = gas_price + self.prio_fee;
        if self.max_fee > 0 {
            priced.min(self.max_fee)
        } else {
            priced
        }
    }
}

#[async_trait]
impl GasStrategy for LegacyGasStrategy {
    async fn resolve(&self, client: &RpcClient) -> Result<GasParams> {
        let gas_price = client.get_gas_price().await?;
        Ok(GasParams::Legacy {
            gas_price: self.cap(gas_price),
        })
    }

    fn apply(&self, tx: &mut TransactionRequest, params: GasParams) {
        if let GasParams::Legacy { gas_price } = params {
            tx.set_gas_price(gas_price);
        }
    }

    fn name(&self) -> &'static str {
        "Legacy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_at_configured_max_fee() {
        let strategy = LegacyGasStrategy::new(1_000_000_000, 5_000_000_000);
        assert_eq!(strategy.cap(2_000_000_000), 3_000_000_000);
        assert_eq!(strategy.cap(10_000_000_000), 5_000_000_000);
    }

    #[test]
    fn zero_max_fee_disables_cap() {
        let strategy = LegacyGasStrategy::new(1_000_000_000, 0);
        assert_eq!(strategy.cap(10_000_000_000), 11_000_000_000);
    }
}
