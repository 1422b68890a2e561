//! Claim queue and processing pipeline (section 4.5).
//!
//! Single-threaded cooperative model: `tick()` is non-reentrant (a running
//! tick sets `ticking` and short-circuits re-entry), and all shared state
//! (queue, pending, history, wallet) is mutated only from inside a tick or
//! a receipt continuation that the same task drives — no locks are needed
//! because execution is serialized by the cooperative scheduler, not by a
//! mutex. Receipt watchers are modeled as entries in a `FuturesUnordered`
//! polled from the same `run()` loop rather than `tokio::spawn`-ed tasks,
//! so "detach a receipt watcher" stays inside the single logical task.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes, B256, U256};
use faucet_api::{ClaimStatsEntry, ClaimStore, RewardLimiter, StatsSink};
use faucet_chain::{BuildTxParams, GasStrategy, RpcClient, WalletSigner};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::amount::{is_contract, readable_amount};
use crate::claim::{ClaimEvent, ClaimEventBus, ClaimStatus, ClaimTx};
use crate::config::{CoinType, FaucetConfig};
use crate::error::{CoreError, Result};
use crate::receipt::await_receipt;
use crate::refill::RefillController;
use crate::status::StatusPublisher;
use crate::wallet::WalletState;

const TICK_PERIOD: Duration = Duration::from_secs(2);
const HISTORY_TTL: Duration = Duration::from_secs(30 * 60);
const SUBMIT_MAX_ATTEMPTS: u32 = 4;
const SUBMIT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Everything the pipeline needs beyond its own owned state: the durable
/// store, stats sink, and reward limiter collaborators, bundled once at
/// construction instead of reached through a process-wide registry.
pub struct PipelineDeps {
    pub store: Arc<dyn ClaimStore>,
    pub stats: Arc<dyn StatsSink>,
    pub reward_limiter: Arc<dyn RewardLimiter>,
}

struct HistoryEntry {
    claim: ClaimTx,
    evict_at: Instant,
}

/// Outcome of a receipt watch, tagged by what produced it so `run()` can
/// route it back to the right bookkeeping path.
enum WatchOutcome {
    Payout { txhash: B256, result: std::result::Result<ReceiptInfo, String> },
}

struct ReceiptInfo {
    block: u64,
    fee: U256,
}

pub struct Pipeline {
    config: FaucetConfig,
    client: Arc<RpcClient>,
    signer: WalletSigner,
    gas: Box<dyn GasStrategy>,
    wallet: WalletState,
    status_publisher: StatusPublisher,
    refill: Option<RefillController>,
    deps: PipelineDeps,
    events: ClaimEventBus,

    queue: VecDeque<ClaimTx>,
    pending: HashMap<B256, ClaimTx>,
    history: HashMap<u64, HistoryEntry>,
    queue_idx_counter: u64,
    last_processed_claim_idx: Option<u64>,

    ticking: AtomicBool,
    watches: FuturesUnordered<std::pin::Pin<Box<dyn std::future::Future<Output = WatchOutcome> + Send>>>,
}

impl Pipeline {
    pub fn new(
        config: FaucetConfig,
        client: Arc<RpcClient>,
        signer: WalletSigner,
        gas: Box<dyn GasStrategy>,
        wallet: WalletState,
        deps: PipelineDeps,
    ) -> Self {
        let status_publisher =
            StatusPublisher::new(config.status.clone(), config.eth.tx_gas_limit, config.eth.tx_max_fee);
        let refill = config
            .refill
            .clone()
            .map(|rc| RefillController::new(rc, deps.reward_limiter.clone()))
            .transpose()
            .expect("vault ABI configured at startup must parse");

        Self {
            config,
            client,
            signer,
            gas,
            wallet,
            status_publisher,
            refill,
            deps,
            events: ClaimEventBus::default(),
            queue: VecDeque::new(),
            pending: HashMap::new(),
            history: HashMap::new(),
            queue_idx_counter: 0,
            last_processed_claim_idx: None,
            ticking: AtomicBool::new(false),
            watches: FuturesUnordered::new(),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ClaimEvent> {
        self.events.subscribe()
    }

    /// Restore the queue from durable storage. Order of the returned
    /// entries defines initial `queueIdx` assignment.
    pub async fn restore_queue(&mut self) -> Result<()> {
        let entries = self.deps.store.list().await.map_err(CoreError::from)?;
        for entry in entries {
            self.queue_idx_counter += 1;
            self.queue.push_back(ClaimTx::from_queued_entry(self.queue_idx_counter, entry));
        }
        info!(restored = self.queue.len(), "queue restored from durable store");
        Ok(())
    }

    pub fn get_queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn get_queued_amount(&self) -> U256 {
        self.queue.iter().fold(U256::ZERO, |acc, c| acc + c.amount)
    }

    pub fn get_last_processed_claim_idx(&self) -> Option<u64> {
        self.last_processed_claim_idx
    }

    pub fn get_faucet_refill_cooldown(&self) -> u64 {
        self.refill.as_ref().map(RefillController::cooldown_remaining).unwrap_or(0)
    }

    /// Linear search queue, then pending, then history — first match wins.
    pub fn get_claim_transaction(&self, session: &str) -> Option<&ClaimTx> {
        self.queue
            .iter()
            .find(|c| c.session == session)
            .or_else(|| self.pending.values().find(|c| c.session == session))
            .or_else(|| self.history.values().map(|h| &h.claim).find(|c| c.session == session))
    }

    /// `addClaimTransaction`.
    pub async fn add_claim_transaction(&mut self, target: Address, amount: U256, session: String) -> Result<u64> {
        self.queue_idx_counter += 1;
        let queue_idx = self.queue_idx_counter;
        let created_at = now_secs();
        let claim = ClaimTx::new(queue_idx, created_at, target, amount, session);
        self.deps.store.add(claim.to_queued_entry()).await.map_err(CoreError::from)?;
        self.events.publish(ClaimEvent {
            queue_idx,
            session: claim.session.clone(),
            status: ClaimStatus::Queue,
            txhash: None,
            fail_reason: None,
        });
        self.queue.push_back(claim);
        Ok(queue_idx)
    }

    /// Human-readable faucet balance, resolving the ERC-20 symbol/decimals
    /// when in token mode.
    pub async fn readable_balance(&mut self) -> Result<String> {
        let (decimals, symbol) = self.resolve_decimals_and_symbol().await?;
        Ok(readable_amount(self.wallet.token_balance, decimals, &symbol))
    }

    async fn resolve_decimals_and_symbol(&mut self) -> Result<(u8, String)> {
        Ok(match &self.wallet.token {
            Some(_) => {
                self.wallet.ensure_decimals(&self.client).await.map_err(CoreError::Chain)?;
                let decimals = self.wallet.token.as_ref().and_then(|t| t.decimals).unwrap_or(18);
                let symbol = self.config.coin.coin_symbol.clone().unwrap_or_else(|| "TOKEN".to_string());
                (decimals, symbol)
            }
            None => (18, "ETH".to_string()),
        })
    }

    /// `getTransactionQueue(queueOnly?)`: the queued claims, plus pending
    /// and history ones unless `queue_only` is set.
    pub fn get_transaction_queue(&self, queue_only: bool) -> Vec<&ClaimTx> {
        if queue_only {
            return self.queue.iter().collect();
        }
        self.queue
            .iter()
            .chain(self.pending.values())
            .chain(self.history.values().map(|h| &h.claim))
            .collect()
    }

    pub fn get_faucet_address(&self) -> Address {
        self.signer.address()
    }

    /// `getFaucetDecimals(native?)`: native EVM precision is fixed at 18;
    /// token-mode precision is whatever the configured ERC-20 reports.
    pub async fn get_faucet_decimals(&mut self, native: bool) -> Result<u8> {
        if native {
            return Ok(18);
        }
        let (decimals, _) = self.resolve_decimals_and_symbol().await?;
        Ok(decimals)
    }

    /// `readableAmount(amount, native?)`.
    pub async fn readable_amount_for(&mut self, amount: U256, native: bool) -> Result<String> {
        if native {
            return Ok(readable_amount(amount, 18, "ETH"));
        }
        let (decimals, symbol) = self.resolve_decimals_and_symbol().await?;
        Ok(readable_amount(amount, decimals, &symbol))
    }

    /// `getWalletBalance(addr)`: native balance of an arbitrary address, not
    /// necessarily the faucet wallet itself.
    pub async fn get_wallet_balance(&self, addr: Address) -> Result<U256> {
        self.client
            .get_balance(addr, alloy::eips::BlockNumberOrTag::Latest)
            .await
            .map_err(CoreError::Chain)
    }

    /// `checkIsContract(addr)`.
    pub async fn check_is_contract(&self, addr: Address) -> Result<bool> {
        let code = self.client.get_code(addr).await.map_err(CoreError::Chain)?;
        Ok(is_contract(&code))
    }

    /// `getFaucetBalance(native?)`: the faucet wallet's own cached balance.
    pub fn get_faucet_balance(&self, native: bool) -> U256 {
        if native {
            self.wallet.native_balance
        } else {
            self.wallet.token_balance
        }
    }

    /// Drive the pipeline until `shutdown` resolves. An in-progress tick
    /// always finishes before the loop exits.
    pub async fn run(mut self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(TICK_PERIOD);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                Some(outcome) = self.watches.next(), if !self.watches.is_empty() => {
                    self.handle_watch_outcome(outcome).await;
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, stopping pipeline after current tick");
                    break;
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn tick(&mut self) {
        if self.ticking.swap(true, Ordering::SeqCst) {
            debug!("tick already running, skipping");
            return;
        }

        self.evict_history();

        while self.pending.len() < self.config.eth.max_pending && !self.queue.is_empty() {
            let head = self.queue.front().unwrap();
            if self.config.eth.queue_no_funds
                && !(self.wallet.has_gas_reserve(self.config.eth.tx_gas_limit, self.config.eth.tx_max_fee)
                    && self.wallet.can_cover(head.amount, self.config.eth.spare_funds_amount))
            {
                break;
            }
            let claim = self.queue.pop_front().unwrap();
            self.last_processed_claim_idx = Some(claim.queue_idx);
            self.process(claim).await;
        }

        if self.pending.is_empty() && self.wallet.reconciliation_due() {
            if let Err(e) = self.wallet.reconcile(&self.client).await {
                warn!(error = %e, "wallet reconciliation failed during tick");
            }
            self.publish_status().await;
        }

        if self.wallet.ready {
            let queued_amount = self.get_queued_amount();
            if let Some(refill) = &mut self.refill {
                match refill
                    .maybe_refill(&self.client, &self.signer, self.gas.as_ref(), &mut self.wallet, queued_amount)
                    .await
                {
                    Ok(Some(action)) => info!(action = ?action, "refill controller acted"),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "refill controller error"),
                }
            }
        }

        self.ticking.store(false, Ordering::SeqCst);
    }

    /// Derive and log the wallet status (section 4.3/4.4). Best-effort: a
    /// failure to format the readable balance is not itself a status change.
    async fn publish_status(&mut self) {
        let balance = match self.readable_balance().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "could not resolve readable balance for status publish");
                return;
            }
        };
        let status = self.status_publisher.derive(&self.wallet, &balance);
        match status.severity {
            Some(crate::status::Severity::Error) => {
                error!(tier = ?status.tier, message = status.message.as_deref(), "wallet status")
            }
            Some(crate::status::Severity::Warning) => {
                warn!(tier = ?status.tier, message = status.message.as_deref(), "wallet status")
            }
            None => debug!(tier = ?status.tier, "wallet status"),
        }
    }

    fn evict_history(&mut self) {
        let now = Instant::now();
        self.history.retain(|_, entry| entry.evict_at > now);
    }

    #[instrument(skip(self, claim), fields(session = %claim.session, queue_idx = claim.queue_idx))]
    async fn process(&mut self, mut claim: ClaimTx) {
        if !self.wallet.ready
            || !(self.wallet.has_gas_reserve(self.config.eth.tx_gas_limit, self.config.eth.tx_max_fee)
                && self.wallet.can_cover(claim.amount, self.config.eth.spare_funds_amount))
        {
            claim.status = ClaimStatus::Failed;
            claim.fail_reason = Some("insufficient funds or wallet not ready".to_string());
            let _ = self.deps.store.remove(&claim.session).await;
            self.emit_failed(&claim);
            self.insert_history(claim);
            return;
        }

        claim.status = ClaimStatus::Processing;
        self.events.publish(ClaimEvent {
            queue_idx: claim.queue_idx,
            session: claim.session.clone(),
            status: ClaimStatus::Processing,
            txhash: None,
            fail_reason: None,
        });

        let (to, value, data) = self.build_call(&claim);

        let mut first_error = None;
        let mut submitted = None;
        for attempt in 1..=SUBMIT_MAX_ATTEMPTS {
            let params = BuildTxParams {
                to: to.to_string(),
                value,
                nonce: self.wallet.nonce,
                data: data.clone(),
                gas_limit: self.config.eth.tx_gas_limit,
            };
            let gas_params = match self.gas.resolve(&self.client).await {
                Ok(p) => p,
                Err(e) => {
                    first_error.get_or_insert(e.to_string());
                    self.retry_backoff(attempt).await;
                    continue;
                }
            };
            let signed = match self.signer.build_and_sign(params, gas_params, self.gas.as_ref()).await {
                Ok(s) => s,
                Err(e) => {
                    first_error.get_or_insert(e.to_string());
                    self.retry_backoff(attempt).await;
                    continue;
                }
            };
            match self.client.send_raw_transaction(&signed.raw).await {
                Ok(s) => {
                    submitted = Some((s, signed.raw_hex, claim.nonce_used(self.wallet.nonce)));
                    break;
                }
                Err(e) => {
                    first_error.get_or_insert(e.to_string());
                    self.retry_backoff(attempt).await;
                }
            }
        }

        let Some((submitted, raw_hex, nonce)) = submitted else {
            claim.status = ClaimStatus::Failed;
            claim.fail_reason = first_error;
            let _ = self.deps.store.remove(&claim.session).await;
            self.emit_failed(&claim);
            self.insert_history(claim);
            return;
        };

        // Submission succeeded: mutate wallet state, move claim to pending.
        self.wallet.nonce += 1;
        self.wallet.token_balance = self.wallet.token_balance.saturating_sub(claim.amount);
        if self.wallet.coin_type() == CoinType::Native {
            self.wallet.native_balance = self.wallet.native_balance.saturating_sub(claim.amount);
        }

        claim.nonce = Some(nonce);
        claim.txhex = Some(raw_hex);
        claim.txhash = Some(submitted.hash);
        claim.status = ClaimStatus::Pending;
        let _ = self.deps.store.remove(&claim.session).await;

        self.events.publish(ClaimEvent {
            queue_idx: claim.queue_idx,
            session: claim.session.clone(),
            status: ClaimStatus::Pending,
            txhash: claim.txhash,
            fail_reason: None,
        });

        let txhash = submitted.hash;
        self.pending.insert(txhash, claim);
        self.publish_status().await;

        let client = self.client.clone();
        self.watches.push(Box::pin(async move {
            let result = match await_receipt(&client, submitted).await {
                Ok(r) if !r.status() => Err(format!("payout reverted: {:?}", r.transaction_hash)),
                Ok(r) => Ok(ReceiptInfo {
                    block: r.block_number.unwrap_or_default(),
                    fee: U256::from(r.effective_gas_price) * U256::from(r.gas_used),
                }),
                Err(e) => Err(e.to_string()),
            };
            WatchOutcome::Payout { txhash, result }
        }));
    }

    fn build_call(&self, claim: &ClaimTx) -> (Address, U256, Bytes) {
        match &self.wallet.token {
            Some(token) => {
                let erc20 = faucet_chain::Erc20Token::new(token.address);
                (token.address, U256::ZERO, erc20.transfer_calldata(claim.target, claim.amount))
            }
            None => (claim.target, claim.amount, Bytes::new()),
        }
    }

    async fn retry_backoff(&mut self, attempt: u32) {
        if attempt == SUBMIT_MAX_ATTEMPTS {
            return;
        }
        tokio::time::sleep(SUBMIT_RETRY_DELAY).await;
        let _ = self.wallet.reconcile(&self.client).await;
    }

    async fn handle_watch_outcome(&mut self, outcome: WatchOutcome) {
        let WatchOutcome::Payout { txhash, result } = outcome;
        let Some(mut claim) = self.pending.remove(&txhash) else {
            return;
        };

        match result {
            Ok(info) => {
                claim.txblock = Some(info.block);
                claim.txfee = Some(info.fee);
                self.wallet.native_balance = self.wallet.native_balance.saturating_sub(info.fee);
                if self.wallet.coin_type() == CoinType::Native {
                    self.wallet.token_balance = self.wallet.token_balance.saturating_sub(info.fee);
                }
                claim.status = ClaimStatus::Confirmed;
                self.events.publish(ClaimEvent {
                    queue_idx: claim.queue_idx,
                    session: claim.session.clone(),
                    status: ClaimStatus::Confirmed,
                    txhash: Some(txhash),
                    fail_reason: None,
                });
                self.deps
                    .stats
                    .add_claim_stats(ClaimStatsEntry {
                        session: claim.session.clone(),
                        target: claim.target,
                        amount: claim.amount,
                        txhash: format!("{txhash:#x}"),
                    })
                    .await;
            }
            Err(reason) => {
                claim.status = ClaimStatus::Failed;
                claim.fail_reason = Some(reason);
                self.emit_failed(&claim);
            }
        }

        self.insert_history(claim);
    }

    fn emit_failed(&self, claim: &ClaimTx) {
        self.events.publish(ClaimEvent {
            queue_idx: claim.queue_idx,
            session: claim.session.clone(),
            status: ClaimStatus::Failed,
            txhash: claim.txhash,
            fail_reason: claim.fail_reason.clone(),
        });
    }

    /// History is keyed by `queue_idx`, not `nonce`: two historical claims
    /// could otherwise share a nonce after a node reset and evict one
    /// another.
    fn insert_history(&mut self, claim: ClaimTx) {
        let queue_idx = claim.queue_idx;
        self.history.insert(
            queue_idx,
            HistoryEntry {
                claim,
                evict_at: Instant::now() + HISTORY_TTL,
            },
        );
    }
}

impl ClaimTx {
    fn nonce_used(&self, wallet_nonce: u64) -> u64 {
        wallet_nonce
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoinConfig, EthConfig, StatusConfig};
    use faucet_api::{LoggingStatsSink, MemoryClaimStore, ZeroRewardLimiter};
    use faucet_chain::build_gas_strategy;

    #[test]
    fn queued_amount_sums_queue_only() {
        let mut queue = VecDeque::new();
        queue.push_back(ClaimTx::new(1, 0, Address::ZERO, U256::from(10u64), "a".into()));
        queue.push_back(ClaimTx::new(2, 0, Address::ZERO, U256::from(20u64), "b".into()));
        let total: U256 = queue.iter().fold(U256::ZERO, |acc, c| acc + c.amount);
        assert_eq!(total, U256::from(30u64));
    }

    fn test_config() -> FaucetConfig {
        FaucetConfig {
            eth: EthConfig {
                rpc_host: "http://127.0.0.1:8545".into(),
                chain_id: Some(1),
                wallet_key: String::new(),
                legacy_tx: false,
                tx_gas_limit: 21_000,
                tx_max_fee: 1,
                tx_prio_fee: 1,
                max_pending: 4,
                queue_no_funds: true,
                spare_funds_amount: U256::ZERO,
            },
            status: StatusConfig::default(),
            coin: CoinConfig::default(),
            refill: None,
        }
    }

    // Requires network only to construct the RPC transport; no request is
    // made until a pipeline tick runs, but building a real client still
    // needs the teacher's test key and live runtime, hence `#[ignore]`.
    #[tokio::test]
    #[ignore] // Requires network
    async fn add_and_get_claim_transaction_round_trips() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer = faucet_chain::WalletSigner::from_private_key(key, 1).unwrap();
        let client = faucet_chain::RpcClient::connect("http://127.0.0.1:8545").await.unwrap();
        let gas = build_gas_strategy(false, 1, 1);
        let wallet = WalletState::new(signer.address(), Some(1), None);
        let deps = PipelineDeps {
            store: Arc::new(MemoryClaimStore::new()),
            stats: Arc::new(LoggingStatsSink),
            reward_limiter: Arc::new(ZeroRewardLimiter),
        };

        let mut pipeline = Pipeline::new(test_config(), Arc::new(client), signer, gas, wallet, deps);
        let idx = pipeline
            .add_claim_transaction(Address::repeat_byte(9), U256::from(1_000u64), "sess-1".into())
            .await
            .unwrap();

        assert_eq!(idx, 1);
        assert_eq!(pipeline.get_queue_len(), 1);
        assert_eq!(pipeline.get_queued_amount(), U256::from(1_000u64));

        let found = pipeline.get_claim_transaction("sess-1").unwrap();
        assert_eq!(found.target, Address::repeat_byte(9));
        assert!(pipeline.get_claim_transaction("missing").is_none());
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn restore_queue_preserves_durable_store_insertion_order() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer = faucet_chain::WalletSigner::from_private_key(key, 1).unwrap();
        let client = faucet_chain::RpcClient::connect("http://127.0.0.1:8545").await.unwrap();
        let gas = build_gas_strategy(false, 1, 1);
        let wallet = WalletState::new(signer.address(), Some(1), None);
        let store = Arc::new(MemoryClaimStore::new());
        for i in 0..3u64 {
            store
                .add(faucet_api::QueuedClaimEntry {
                    time: i,
                    target: Address::repeat_byte(i as u8 + 1),
                    amount: U256::from(i),
                    session: format!("s{i}"),
                })
                .await
                .unwrap();
        }
        let deps = PipelineDeps {
            store,
            stats: Arc::new(LoggingStatsSink),
            reward_limiter: Arc::new(ZeroRewardLimiter),
        };

        let mut pipeline = Pipeline::new(test_config(), Arc::new(client), signer, gas, wallet, deps);
        pipeline.restore_queue().await.unwrap();

        let sessions: Vec<_> = pipeline
            .get_transaction_queue(true)
            .into_iter()
            .map(|c| c.session.clone())
            .collect();
        assert_eq!(sessions, vec!["s0", "s1", "s2"]);
    }
}
