//! Chain interaction layer for the faucet orchestrator.
//!
//! This crate provides:
//! - Provider management for HTTP, WebSocket and IPC connections, with
//!   pending-tag fallback
//! - Gas pricing strategies (legacy vs EIP-1559)
//! - Transaction signing and raw broadcast
//! - Contract bindings: a typed ERC-20 transfer for token payouts, and a
//!   dynamic-ABI vault binding for refill/overflow withdrawals

mod contracts;
mod error;
mod gas;
mod provider;
mod signer;

pub use contracts::{Erc20Token, VaultContract};
pub use error::{ChainError, Result};
pub use gas::{build_gas_strategy, Eip1559GasStrategy, GasParams, GasStrategy, LegacyGasStrategy};
pub use provider::{ReceiptFuture, RpcClient, SubmittedTx, TransportKind};
pub use signer::{normalize_hex_prefix, BuildTxParams, SignedTx, WalletSigner};
