//! Proof-of-work reward limiter boundary, consulted only for its view of
//! unclaimed reward liability against the faucet wallet.

use alloy::primitives::U256;
use async_trait::async_trait;

#[async_trait]
pub trait RewardLimiter: Send + Sync {
    async fn get_unclaimed_balance(&self) -> U256;
}

/// Default limiter for standalone runs: no outstanding liability.
#[derive(Default)]
pub struct ZeroRewardLimiter;

#[async_trait]
impl RewardLimiter for ZeroRewardLimiter {
    async fn get_unclaimed_balance(&self) -> U256 {
        U256::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_limiter_reports_no_liability() {
        assert_eq!(ZeroRewardLimiter.get_unclaimed_balance().await, U256::ZERO);
    }
}
