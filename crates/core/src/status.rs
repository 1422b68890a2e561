//! Status publisher: derives a coarse wallet status from `WalletState` and
//! renders the configured message template.

use crate::config::StatusConfig;
use crate::wallet::WalletState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStatusTier {
    Normal,
    LowFunds,
    NoFunds,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct WalletStatus {
    pub tier: WalletStatusTier,
    pub message: Option<String>,
    pub severity: Option<Severity>,
}

/// Publishes under a fixed key so later emissions replace earlier ones;
/// modeled here as "compute the latest status", with the key discipline
/// left to whatever sink consumes `WalletStatus` (a `StatsSink`/logger, or
/// a future front-end).
pub struct StatusPublisher {
    config: StatusConfig,
    gas_limit: u64,
    max_fee: u128,
}

impl StatusPublisher {
    pub fn new(config: StatusConfig, gas_limit: u64, max_fee: u128) -> Self {
        Self {
            config,
            gas_limit,
            max_fee,
        }
    }

    pub fn derive(&self, wallet: &WalletState, readable_balance: &str) -> WalletStatus {
        if !wallet.ready {
            return WalletStatus {
                tier: WalletStatusTier::Offline,
                message: self.config.rpc_connection_error.clone(),
                severity: Some(Severity::Error),
            };
        }

        let no_funds = wallet.token_balance <= self.config.no_funds_balance
            || !wallet.has_gas_reserve(self.gas_limit, self.max_fee);
        if no_funds {
            return WalletStatus {
                tier: WalletStatusTier::NoFunds,
                message: render(self.config.no_funds_error.as_deref(), readable_balance),
                severity: Some(Severity::Error),
            };
        }

        if wallet.token_balance <= self.config.low_funds_balance {
            return WalletStatus {
                tier: WalletStatusTier::LowFunds,
                message: render(self.config.low_funds_warning.as_deref(), readable_balance),
                severity: Some(Severity::Warning),
            };
        }

        WalletStatus {
            tier: WalletStatusTier::Normal,
            message: None,
            severity: None,
        }
    }
}

fn render(template: Option<&str>, readable_balance: &str) -> Option<String> {
    template.map(|t| t.replace("{1}", readable_balance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn config() -> StatusConfig {
        StatusConfig {
            no_funds_balance: U256::from(10u64),
            low_funds_balance: U256::from(100u64),
            low_funds_warning: Some("low: {1}".into()),
            no_funds_error: Some("empty: {1}".into()),
            rpc_connection_error: Some("offline".into()),
        }
    }

    #[test]
    fn offline_when_not_ready() {
        let publisher = StatusPublisher::new(config(), 21_000, 1);
        let wallet = WalletState::new(Address::ZERO, Some(1), None);
        let status = publisher.derive(&wallet, "0 ETH");
        assert_eq!(status.tier, WalletStatusTier::Offline);
    }

    #[test]
    fn no_funds_when_balance_at_or_below_threshold() {
        let publisher = StatusPublisher::new(config(), 21_000, 1);
        let mut wallet = WalletState::new(Address::ZERO, Some(1), None);
        wallet.ready = true;
        wallet.native_balance = U256::from(1_000_000u64);
        wallet.token_balance = U256::from(10u64);
        let status = publisher.derive(&wallet, "0.00001 ETH");
        assert_eq!(status.tier, WalletStatusTier::NoFunds);
        assert_eq!(status.message.unwrap(), "empty: 0.00001 ETH");
    }

    #[test]
    fn no_funds_when_gas_reserve_insufficient_even_with_token_balance() {
        let publisher = StatusPublisher::new(config(), 21_000, 1);
        let mut wallet = WalletState::new(Address::ZERO, Some(1), None);
        wallet.ready = true;
        wallet.native_balance = U256::from(1u64);
        wallet.token_balance = U256::from(1_000u64);
        let status = publisher.derive(&wallet, "x");
        assert_eq!(status.tier, WalletStatusTier::NoFunds);
    }

    #[test]
    fn low_funds_between_thresholds() {
        let publisher = StatusPublisher::new(config(), 21_000, 1);
        let mut wallet = WalletState::new(Address::ZERO, Some(1), None);
        wallet.ready = true;
        wallet.native_balance = U256::from(1_000_000u64);
        wallet.token_balance = U256::from(50u64);
        let status = publisher.derive(&wallet, "0.00005 ETH");
        assert_eq!(status.tier, WalletStatusTier::LowFunds);
    }

    #[test]
    fn normal_above_all_thresholds() {
        let publisher = StatusPublisher::new(config(), 21_000, 1);
        let mut wallet = WalletState::new(Address::ZERO, Some(1), None);
        wallet.ready = true;
        wallet.native_balance = U256::from(1_000_000u64);
        wallet.token_balance = U256::from(1_000u64);
        let status = publisher.derive(&wallet, "x");
        assert_eq!(status.tier, WalletStatusTier::Normal);
        assert!(status.message.is_none());
    }
}
