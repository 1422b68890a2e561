//! Faucet core orchestration.
//!
//! This crate provides:
//! - Configuration loading (environment-backed, see [`config`])
//! - Wallet state caching and reconciliation against the node
//! - The claim queue and processing pipeline (queue -> processing -> pending
//!   -> confirmed/failed)
//! - The refill/overflow controller that keeps the wallet balance inside a
//!   configured band by calling a vault contract
//! - Wallet status derivation and human-readable amount formatting

mod amount;
mod claim;
pub mod config;
mod error;
mod pipeline;
mod receipt;
mod refill;
mod status;
mod wallet;

pub use amount::{is_contract, readable_amount};
pub use claim::{ClaimEvent, ClaimEventBus, ClaimStatus, ClaimTx};
pub use error::{CoreError, Result};
pub use pipeline::{Pipeline, PipelineDeps};
pub use receipt::await_receipt;
pub use refill::{decide_action, RefillAction, RefillController};
pub use status::{Severity, StatusPublisher, WalletStatus, WalletStatusTier};
pub use wallet::{TokenState, WalletState};
