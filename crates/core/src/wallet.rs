//! Wallet state: the cached view of balances and nonce, reconciled against
//! the node on the schedule described in section 4.3.

use std::time::{Duration, Instant};

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, U256};
use faucet_chain::{ChainError, RpcClient};
use tracing::{debug, instrument, warn};

use crate::config::CoinType;

/// ERC-20 identity, present only in token mode. `decimals` is populated
/// lazily by the first successful query and then cached for the process
/// lifetime — it cannot change for a fixed contract.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub address: Address,
    pub decimals: Option<u8>,
}

impl TokenState {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            decimals: None,
        }
    }
}

/// Cached wallet state. `ready=false` until the first successful
/// reconciliation; reconciliation failures flip it back to `false` rather
/// than leaving stale balances marked fresh.
#[derive(Debug, Clone)]
pub struct WalletState {
    pub ready: bool,
    pub nonce: u64,
    pub native_balance: U256,
    pub token_balance: U256,
    pub address: Address,
    pub chain_id: Option<u64>,
    pub token: Option<TokenState>,
    pub last_refresh: Option<Instant>,
}

impl WalletState {
    pub fn new(address: Address, chain_id: Option<u64>, token: Option<TokenState>) -> Self {
        Self {
            ready: false,
            nonce: 0,
            native_balance: U256::ZERO,
            token_balance: U256::ZERO,
            address,
            chain_id,
            token,
            last_refresh: None,
        }
    }

    /// Whether reconciliation is due: every 600s once ready, every 10s
    /// while not yet ready (section 4.3).
    pub fn reconciliation_due(&self) -> bool {
        let threshold = if self.ready {
            Duration::from_secs(600)
        } else {
            Duration::from_secs(10)
        };
        match self.last_refresh {
            None => true,
            Some(t) => t.elapsed() >= threshold,
        }
    }

    /// `nativeBalance > ethTxGasLimit * ethTxMaxFee` gas reserve check.
    pub fn has_gas_reserve(&self, gas_limit: u64, max_fee: u128) -> bool {
        self.native_balance > U256::from(gas_limit) * U256::from(max_fee)
    }

    /// `tokenBalance - spareFundsAmount >= amount` balance check.
    pub fn can_cover(&self, amount: U256, spare_funds: U256) -> bool {
        self.token_balance.saturating_sub(spare_funds) >= amount
    }

    /// Four parallel reads: native balance and nonce at `pending` (falling
    /// back to `latest` inside `RpcClient` itself), chain id (skipped if
    /// already known), and token balance in token mode. Sets `ready=true`
    /// on success, `ready=false` on any failure.
    #[instrument(skip(self, client), fields(address = %self.address))]
    pub async fn reconcile(&mut self, client: &RpcClient) -> Result<(), ChainError> {
        let result: Result<(), ChainError> = async {
            let native_balance = client
                .get_balance(self.address, BlockNumberOrTag::Pending)
                .await?;
            let nonce = client
                .get_transaction_count(self.address, BlockNumberOrTag::Pending)
                .await?;
            let chain_id = match self.chain_id {
                Some(id) => id,
                None => client.get_chain_id().await?,
            };

            let token_balance = if let Some(token) = &self.token {
                let erc20 = faucet_chain::Erc20Token::new(token.address);
                erc20.balance_of(client, self.address).await?
            } else {
                native_balance
            };

            self.native_balance = native_balance;
            self.nonce = nonce;
            self.chain_id = Some(chain_id);
            self.token_balance = token_balance;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.ready = true;
                self.last_refresh = Some(Instant::now());
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "wallet reconciliation failed");
                self.ready = false;
                Err(e)
            }
        }
    }

    /// Lazily fetch and cache the ERC-20 token's decimals. No-op in native
    /// mode.
    pub async fn ensure_decimals(&mut self, client: &RpcClient) -> Result<(), ChainError> {
        let Some(token) = &mut self.token else {
            return Ok(());
        };
        if token.decimals.is_some() {
            return Ok(());
        }
        let erc20 = faucet_chain::Erc20Token::new(token.address);
        let decimals = erc20.decimals(client).await?;
        debug!(decimals, "fetched token decimals");
        token.decimals = Some(decimals);
        Ok(())
    }

    pub fn coin_type(&self) -> CoinType {
        if self.token.is_some() {
            CoinType::Erc20
        } else {
            CoinType::Native
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_reserve_check_matches_strict_inequality() {
        let mut state = WalletState::new(Address::ZERO, Some(1), None);
        state.native_balance = U256::from(100u64);
        assert!(!state.has_gas_reserve(10, 10)); // 100 > 100 is false
        assert!(state.has_gas_reserve(10, 9));
    }

    #[test]
    fn can_cover_accounts_for_spare_funds_reserve() {
        let mut state = WalletState::new(Address::ZERO, Some(1), None);
        state.token_balance = U256::from(100u64);
        assert!(state.can_cover(U256::from(50u64), U256::from(40u64)));
        assert!(!state.can_cover(U256::from(61u64), U256::from(40u64)));
    }

    #[test]
    fn reconciliation_due_before_first_refresh() {
        let state = WalletState::new(Address::ZERO, Some(1), None);
        assert!(state.reconciliation_due());
    }
}
