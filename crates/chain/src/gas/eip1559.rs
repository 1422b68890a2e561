//! EIP-1559 gas pricing: static `maxPriorityFeePerGas`/`maxFeePerGas` from
//! config, no per-transaction node query.

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use super::{GasParams, GasStrategy};
use crate::error::Result;
use crate::provider::RpcClient;

#[derive(Debug)]
pub struct Eip1559GasStrategy {
    prio_fee: u128,
    max_fee: u128,
}

impl Eip1559GasStrategy {
    pub fn new(prio_fee: u128, max_fee: u128) -> Self {
        Self { prio_fee, max_fee }
    }
}

#[async_trait]
impl GasStrategy for Eip1559GasStrategy {
    async fn resolve(&self, _client: &RpcClient) -> Result<GasParams> {
        Ok(GasParams::Eip1559 {
            max_fee_per_gas: self.max_fee,
            max_priority_fee_per_gas: self.prio_fee,
        })
    }

    fn apply(&self, tx: &mut TransactionRequest, params: GasParams) {
        if let GasParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } = params
        {
            tx.set_max_fee_per_gas(max_fee_per_gas);
            tx.set_max_priority_fee_per_gas(max_priority_fee_per_gas);
        }
    }

    fn name(&self) -> &'static str {
        "EIP-1559"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn apply_sets_both_fee_fields() {
        let strategy = Eip1559GasStrategy::new(2_000_000_000, 50_000_000_000);
        let mut tx = TransactionRequest::default().with_to(Address::ZERO);
        strategy.apply(
            &mut tx,
            GasParams::Eip1559 {
                max_fee_per_gas: 50_000_000_000,
                max_priority_fee_per_gas: 2_000_000_000,
            },
        );
        assert_eq!(tx.max_fee_per_gas, Some(50_000_000_000));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2_000_000_000));
    }
}
