//! Core orchestration error kinds. Transient RPC errors are swallowed at
//! the call site (see the wallet reconciliation and receipt-poll paths) and
//! never reach this enum; it exists for the failures callers need to match
//! on by kind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("wallet reconciliation failed: {0}")]
    Reconciliation(#[source] faucet_chain::ChainError),

    #[error("transaction submission failed after {attempts} attempts: {source}")]
    Submission {
        attempts: u32,
        #[source]
        source: faucet_chain::ChainError,
    },

    #[error("refill attempt failed: {0}")]
    Refill(String),

    #[error("insufficient funds for claim")]
    InsufficientFunds,

    #[error("wallet not ready")]
    WalletNotReady,

    #[error(transparent)]
    Chain(#[from] faucet_chain::ChainError),

    #[error("claim store error: {0}")]
    Store(#[from] faucet_api::ClaimStoreError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
