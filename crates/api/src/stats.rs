//! Statistics sink boundary.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ClaimStatsEntry {
    pub session: String,
    pub target: Address,
    pub amount: U256,
    pub txhash: String,
}

#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn add_claim_stats(&self, entry: ClaimStatsEntry);
}

/// Default sink for standalone runs: logs at info level instead of writing
/// to a metrics backend.
#[derive(Default)]
pub struct LoggingStatsSink;

#[async_trait]
impl StatsSink for LoggingStatsSink {
    async fn add_claim_stats(&self, entry: ClaimStatsEntry) {
        info!(
            session = %entry.session,
            target = %entry.target,
            amount = %entry.amount,
            txhash = %entry.txhash,
            "claim stats recorded"
        );
    }
}
