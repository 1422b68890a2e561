//! Durable queue storage boundary.
//!
//! The orchestrator restores its queue from this store at startup and keeps
//! it in sync on every enqueue/terminal transition. Order of
//! [`ClaimStore::list`]'s result defines initial `queueIdx` assignment.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimStoreError {
    #[error("claim store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ClaimStoreError>;

/// The durable, serializable form of a queued claim: `{time, target, amount,
/// session}` — everything needed to reconstruct a `ClaimTx` at `QUEUE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedClaimEntry {
    pub time: u64,
    pub target: Address,
    pub amount: U256,
    pub session: String,
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn list(&self) -> Result<Vec<QueuedClaimEntry>>;
    async fn add(&self, entry: QueuedClaimEntry) -> Result<()>;
    async fn remove(&self, session: &str) -> Result<()>;
}

/// In-process store for tests and standalone runs. Entries are kept in
/// insertion order so restoration preserves `queueIdx` assignment.
#[derive(Default)]
pub struct MemoryClaimStore {
    entries: Mutex<BTreeMap<u64, QueuedClaimEntry>>,
    seq: Mutex<u64>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn list(&self) -> Result<Vec<QueuedClaimEntry>> {
        Ok(self.entries.lock().unwrap().values().cloned().collect())
    }

    async fn add(&self, entry: QueuedClaimEntry) -> Result<()> {
        let mut seq = self.seq.lock().unwrap();
        *seq += 1;
        self.entries.lock().unwrap().insert(*seq, entry);
        Ok(())
    }

    async fn remove(&self, session: &str) -> Result<()> {
        self.entries.lock().unwrap().retain(|_, e| e.session != session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restores_entries_in_insertion_order() {
        let store = MemoryClaimStore::new();
        for i in 0..3u64 {
            store
                .add(QueuedClaimEntry {
                    time: i,
                    target: Address::repeat_byte(i as u8 + 1),
                    amount: U256::from(i),
                    session: format!("s{i}"),
                })
                .await
                .unwrap();
        }
        let listed = store.list().await.unwrap();
        let sessions: Vec<_> = listed.iter().map(|e| e.session.clone()).collect();
        assert_eq!(sessions, vec!["s0", "s1", "s2"]);
    }

    #[tokio::test]
    async fn remove_drops_only_matching_session() {
        let store = MemoryClaimStore::new();
        store
            .add(QueuedClaimEntry {
                time: 0,
                target: Address::ZERO,
                amount: U256::ZERO,
                session: "keep".into(),
            })
            .await
            .unwrap();
        store
            .add(QueuedClaimEntry {
                time: 1,
                target: Address::ZERO,
                amount: U256::ZERO,
                session: "drop".into(),
            })
            .await
            .unwrap();
        store.remove("drop").await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session, "keep");
    }
}
