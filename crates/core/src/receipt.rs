//! Shared receipt-watch logic: await the receipt future returned by
//! submission, falling back to 30s polling if the node or client library
//! gives up waiting before the transaction is mined (section 4.5 step 6,
//! section 4.6).

use alloy::primitives::B256;
use alloy::rpc::types::TransactionReceipt;
use faucet_chain::{ChainError, RpcClient, SubmittedTx};
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Resolve a submitted transaction to its receipt. "Transaction was not
/// mined within ..." is not treated as a failure: it switches to polling
/// `getTransactionReceipt` every 30s. A `CONNECTION ERROR` observed while
/// polling is retried rather than propagated.
pub async fn await_receipt(client: &RpcClient, submitted: SubmittedTx) -> Result<TransactionReceipt, ChainError> {
    match submitted.receipt.await {
        Ok(receipt) => Ok(receipt),
        Err(ChainError::NotMinedInTime) => poll_for_receipt(client, submitted.hash).await,
        Err(e) => Err(e),
    }
}

async fn poll_for_receipt(client: &RpcClient, hash: B256) -> Result<TransactionReceipt, ChainError> {
    loop {
        sleep(Duration::from_secs(30)).await;
        match client.get_transaction_receipt(hash).await {
            Ok(Some(receipt)) => return Ok(receipt),
            Ok(None) => continue,
            Err(ChainError::ConnectionError(_)) => {
                debug!(%hash, "connection error while polling receipt, retrying");
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}
