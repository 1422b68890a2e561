//! Error types for the chain adapter layer.

use thiserror::Error;

/// Errors raised by the RPC client, transaction builder, and contract helpers.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("\"pending\" tag not supported by node")]
    PendingTagUnsupported,

    #[error("transaction submission rejected: {0}")]
    Submission(String),

    #[error("transaction was not mined within the configured window")]
    NotMinedInTime,

    #[error("connection error, should retry: {0}")]
    ConnectionError(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("abi error: {0}")]
    Abi(String),
}

impl ChainError {
    /// True for the node's `"pending" is not yet supported` rejection, which
    /// triggers an automatic fallback to the `latest` tag.
    pub fn is_pending_tag_unsupported(msg: &str) -> bool {
        msg.contains("\"pending\" is not yet supported")
    }

    /// True for the receipt-wait timeout that should fall back to polling
    /// rather than being treated as a submission failure.
    pub fn is_not_mined_in_time(msg: &str) -> bool {
        msg.contains("Transaction was not mined within")
    }

    /// True for a transient connection error that the receipt poller retries.
    pub fn is_connection_error(msg: &str) -> bool {
        msg.contains("CONNECTION ERROR")
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
