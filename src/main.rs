//! Faucet payout orchestrator.
//!
//! Drains a queue of claim requests against a single signing wallet,
//! reconciling wallet state against the node and, when configured,
//! refilling the wallet from a vault contract when its balance drops
//! below a trigger threshold.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faucet_api::{LoggingStatsSink, MemoryClaimStore, ZeroRewardLimiter};
use faucet_chain::{build_gas_strategy, RpcClient, WalletSigner};
use faucet_core::{
    config::{CoinType, FaucetConfig},
    Pipeline, PipelineDeps, TokenState, WalletState,
};

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,faucet_core=debug,faucet_chain=debug")),
        )
        .init();

    let config = FaucetConfig::from_env().context("loading faucet configuration")?;

    info!(rpc_host = %config.eth.rpc_host, coin_type = ?config.coin.coin_type, "starting faucet orchestrator");

    let client = RpcClient::connect(&config.eth.rpc_host)
        .await
        .context("connecting to rpc endpoint")?;

    let chain_id = match config.eth.chain_id {
        Some(id) => id,
        None => client.get_chain_id().await.context("querying chain id")?,
    };

    let signer = WalletSigner::from_private_key(&config.eth.wallet_key, chain_id)
        .context("loading wallet signing key")?;
    let gas = build_gas_strategy(config.eth.legacy_tx, config.eth.tx_prio_fee, config.eth.tx_max_fee);

    let token = match config.coin.coin_type {
        CoinType::Erc20 => {
            let address = config
                .coin
                .coin_contract
                .context("FAUCET_COIN_TYPE=erc20 requires FAUCET_COIN_CONTRACT")?;
            Some(TokenState::new(address))
        }
        CoinType::Native => None,
    };
    let mut wallet = WalletState::new(signer.address(), Some(chain_id), token);
    wallet.reconcile(&client).await.context("initial wallet reconciliation")?;

    info!(address = %signer.address(), "wallet ready");

    let deps = PipelineDeps {
        store: Arc::new(MemoryClaimStore::new()),
        stats: Arc::new(LoggingStatsSink),
        reward_limiter: Arc::new(ZeroRewardLimiter),
    };

    let mut pipeline = Pipeline::new(config, Arc::new(client), signer, gas, wallet, deps);
    pipeline.restore_queue().await.context("restoring queue from durable store")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(());
    });

    info!("entering claim processing loop");
    pipeline.run(shutdown_rx).await;

    info!("faucet orchestrator stopped");
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔═╗╔═╗╦ ╦╔═╗╔═╗╔╦╗
    ╠╣ ╠═╣║ ║║  ║╣  ║
    ╚  ╩ ╩╚═╝╚═╝╚═╝ ╩
    Faucet Orchestrator v0.1.0
    "#
    );
}
