//! Claim transaction data model and lifecycle events.

use alloy::primitives::{Address, B256, U256};
use faucet_api::QueuedClaimEntry;
use tokio::sync::broadcast;

/// Monotonic lifecycle states. Transitions are checked only by the pipeline
/// that drives them (`QUEUE -> PROCESSING -> PENDING -> {CONFIRMED|FAILED}`,
/// `PROCESSING -> FAILED` directly); this type itself does not enforce the
/// ordering, it just names the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Queue,
    Processing,
    Pending,
    Confirmed,
    Failed,
}

/// A single faucet payout request and everything learned about it as it
/// moves through the pipeline.
#[derive(Debug, Clone)]
pub struct ClaimTx {
    pub queue_idx: u64,
    pub status: ClaimStatus,
    pub created_at: u64,
    pub target: Address,
    pub amount: U256,
    pub session: String,
    pub nonce: Option<u64>,
    pub txhex: Option<String>,
    pub txhash: Option<B256>,
    pub txblock: Option<u64>,
    pub txfee: Option<U256>,
    /// Kept for durability; the retry loop in `process()` uses its own
    /// local counter and never reads this field back.
    pub retry_count: u32,
    pub fail_reason: Option<String>,
}

impl ClaimTx {
    pub fn new(queue_idx: u64, created_at: u64, target: Address, amount: U256, session: String) -> Self {
        Self {
            queue_idx,
            status: ClaimStatus::Queue,
            created_at,
            target,
            amount,
            session,
            nonce: None,
            txhex: None,
            txhash: None,
            txblock: None,
            txfee: None,
            retry_count: 0,
            fail_reason: None,
        }
    }

    /// Durable-storage form: `{time, target, amount, session}`.
    pub fn to_queued_entry(&self) -> QueuedClaimEntry {
        QueuedClaimEntry {
            time: self.created_at,
            target: self.target,
            amount: self.amount,
            session: self.session.clone(),
        }
    }

    pub fn from_queued_entry(queue_idx: u64, entry: QueuedClaimEntry) -> Self {
        Self::new(queue_idx, entry.time, entry.target, entry.amount, entry.session)
    }
}

/// One lifecycle transition notification, broadcast to any number of
/// listeners. No ordering guarantee across distinct claims; transitions for
/// a single claim are always emitted in order since the pipeline is the
/// sole, sequential emitter.
#[derive(Debug, Clone)]
pub struct ClaimEvent {
    pub queue_idx: u64,
    pub session: String,
    pub status: ClaimStatus,
    pub txhash: Option<B256>,
    pub fail_reason: Option<String>,
}

/// Fan-out channel for claim lifecycle events. Cloning shares the same
/// underlying channel; a fresh subscription only observes events emitted
/// after it was created.
#[derive(Clone)]
pub struct ClaimEventBus {
    sender: broadcast::Sender<ClaimEvent>,
}

impl ClaimEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClaimEvent> {
        self.sender.subscribe()
    }

    /// Best-effort: a send with no subscribers is not an error.
    pub fn publish(&self, event: ClaimEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ClaimEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_entry_round_trips_time_target_amount_session() {
        let claim = ClaimTx::new(1, 42, Address::repeat_byte(7), U256::from(1000u64), "sess".into());
        let entry = claim.to_queued_entry();
        let restored = ClaimTx::from_queued_entry(1, entry);
        assert_eq!(restored.created_at, 42);
        assert_eq!(restored.target, Address::repeat_byte(7));
        assert_eq!(restored.amount, U256::from(1000u64));
        assert_eq!(restored.session, "sess");
    }

    #[tokio::test]
    async fn publish_delivers_to_subscriber() {
        let bus = ClaimEventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(ClaimEvent {
            queue_idx: 1,
            session: "s".into(),
            status: ClaimStatus::Queue,
            txhash: None,
            fail_reason: None,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.queue_idx, 1);
    }
}
