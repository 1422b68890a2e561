//! Wallet signer and transaction builder.
//!
//! The faucet is a single serial signer: exactly one [`WalletSigner`] per
//! process, and the caller (the claim pipeline) is responsible for handing
//! out nonces one at a time — this module never reads or caches a nonce
//! itself, it only signs whatever it is given.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::error::{ChainError, Result};
use crate::gas::{GasParams, GasStrategy};

/// Normalize an exact upper-case `0X` prefix to `0x`. Deliberately narrow:
/// the source faucet's `buildEthTx` only rewrites this one exact prefix, it
/// does not case-fold the rest of the string.
pub fn normalize_hex_prefix(s: &str) -> String {
    match s.strip_prefix("0X") {
        Some(rest) => format!("0x{rest}"),
        None => s.to_string(),
    }
}

/// Inputs to a single transaction build.
pub struct BuildTxParams {
    pub to: String,
    pub value: U256,
    pub nonce: u64,
    pub data: Bytes,
    pub gas_limit: u64,
}

/// A signed transaction ready for broadcast.
pub struct SignedTx {
    pub raw: Bytes,
    /// Hex encoding of the raw transaction, without a `0x` prefix. The
    /// submission path is responsible for prepending it.
    pub raw_hex: String,
    pub nonce: u64,
}

/// Holds the faucet's signing key and builds/signs payout and refill
/// transactions against a fixed chain id.
pub struct WalletSigner {
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    address: Address,
    chain_id: u64,
}

impl WalletSigner {
    /// Parse a hex-encoded secp256k1 private key (with or without `0x`).
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let key = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| ChainError::Signing(format!("invalid private key: {e}")))?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());

        Ok(Self {
            signer,
            wallet,
            address,
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build and sign a transaction, applying the chosen gas strategy's
    /// parameters. The transaction type (legacy vs EIP-1559) follows from
    /// which `GasParams` variant the strategy resolved.
    pub async fn build_and_sign(
        &self,
        params: BuildTxParams,
        gas: GasParams,
        strategy: &dyn GasStrategy,
    ) -> Result<SignedTx> {
        let to = normalize_hex_prefix(&params.to);
        let to: Address = to
            .parse()
            .map_err(|_| ChainError::InvalidAddress(to.clone()))?;

        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_value(params.value)
            .with_nonce(params.nonce)
            .with_input(params.data)
            .with_gas_limit(params.gas_limit)
            .with_chain_id(self.chain_id);

        strategy.apply(&mut tx, gas);

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let raw: Bytes = alloy::eips::eip2718::Encodable2718::encoded_2718(&envelope).into();
        let raw_hex = hex::encode(&raw);

        Ok(SignedTx {
            raw,
            raw_hex,
            nonce: params.nonce,
        })
    }

    /// Reference to the private key signer, for cases where a raw
    /// `PrivateKeySigner` is needed directly (typed contract calls).
    pub fn local_signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_exact_uppercase_prefix_only() {
        assert_eq!(normalize_hex_prefix("0Xabcdef"), "0xabcdef");
        assert_eq!(normalize_hex_prefix("0xabcdef"), "0xabcdef");
        // Mixed-case elsewhere in the string is intentionally left alone.
        assert_eq!(normalize_hex_prefix("0xABCDEF"), "0xABCDEF");
    }

    #[test]
    fn wallet_from_private_key_derives_address() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let wallet = WalletSigner::from_private_key(key, 1).unwrap();
        assert_eq!(
            format!("{:#x}", wallet.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }
}
