//! Refill controller: keeps the faucet wallet within a target balance band
//! by withdrawing from (or depositing to) a configured vault contract.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, U256};
use faucet_api::RewardLimiter;
use faucet_chain::{BuildTxParams, GasStrategy, RpcClient, VaultContract, WalletSigner};
use tracing::{info, instrument, warn};

use crate::config::RefillConfig;
use crate::error::{CoreError, Result};
use crate::receipt::await_receipt;
use crate::wallet::WalletState;

const ATTEMPT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillAction {
    None,
    Refill { amount: U256 },
    Overflow { amount: U256 },
}

/// Decide whether effective balance calls for a refill, an overflow, or
/// nothing (section 4.6).
pub fn decide_action(
    config: &RefillConfig,
    token_balance: U256,
    unclaimed_liability: U256,
    queued_amount: U256,
) -> RefillAction {
    let effective = token_balance
        .saturating_sub(unclaimed_liability)
        .saturating_sub(queued_amount);

    if let Some(overflow_balance) = config.overflow_balance {
        if effective > overflow_balance {
            return RefillAction::Overflow {
                amount: effective - overflow_balance,
            };
        }
    }
    if effective < config.trigger_balance {
        return RefillAction::Refill { amount: config.request_amount };
    }
    RefillAction::None
}

/// Substitute `{walletAddr}`/`{amount}`/`{token}` placeholders in a vault
/// call-argument template. Anything else is parsed as an address, then a
/// decimal integer, falling back to a raw string literal.
fn substitute_arg(template: &str, wallet_addr: Address, amount: U256, token: Address) -> DynSolValue {
    match template {
        "{walletAddr}" => DynSolValue::Address(wallet_addr),
        "{amount}" => DynSolValue::Uint(amount, 256),
        "{token}" => DynSolValue::Address(token),
        other => {
            if let Ok(addr) = other.parse::<Address>() {
                DynSolValue::Address(addr)
            } else if let Ok(n) = U256::from_str_radix(other, 10) {
                DynSolValue::Uint(n, 256)
            } else {
                DynSolValue::String(other.to_string())
            }
        }
    }
}

fn substitute_args(templates: &[String], wallet_addr: Address, amount: U256, token: Address) -> Vec<DynSolValue> {
    templates
        .iter()
        .map(|t| substitute_arg(t, wallet_addr, amount, token))
        .collect()
}

pub struct RefillController {
    config: RefillConfig,
    vault: VaultContract,
    reward_limiter: Arc<dyn RewardLimiter>,
    refilling: bool,
    last_attempt: Option<Instant>,
    pub last_success: Option<Instant>,
}

impl RefillController {
    pub fn new(config: RefillConfig, reward_limiter: Arc<dyn RewardLimiter>) -> Result<Self> {
        let vault = VaultContract::new(config.contract, &config.abi).map_err(CoreError::Chain)?;
        Ok(Self {
            config,
            vault,
            reward_limiter,
            refilling: false,
            last_attempt: None,
            last_success: None,
        })
    }

    pub fn cooldown_remaining(&self) -> u64 {
        match self.last_success {
            None => 0,
            Some(t) => {
                let elapsed = t.elapsed().as_secs();
                self.config.cooldown_time.saturating_sub(elapsed)
            }
        }
    }

    fn guards_pass(&self) -> bool {
        if self.refilling {
            return false;
        }
        if let Some(last) = self.last_attempt {
            if last.elapsed() < ATTEMPT_COOLDOWN {
                return false;
            }
        }
        self.cooldown_remaining() == 0
    }

    /// Run one tick of the refill controller. Guarded by: another attempt
    /// in progress, last attempt under 60s ago, or last success still
    /// within the configured cooldown.
    #[instrument(skip_all)]
    pub async fn maybe_refill(
        &mut self,
        client: &RpcClient,
        signer: &WalletSigner,
        gas: &dyn GasStrategy,
        wallet: &mut WalletState,
        queued_amount: U256,
    ) -> Result<Option<RefillAction>> {
        if !self.guards_pass() {
            return Ok(None);
        }

        let unclaimed = self.reward_limiter.get_unclaimed_balance().await;
        let action = decide_action(&self.config, wallet.token_balance, unclaimed, queued_amount);
        if action == RefillAction::None {
            return Ok(None);
        }

        self.refilling = true;
        self.last_attempt = Some(Instant::now());

        let outcome = match action {
            RefillAction::Refill { amount } => self.refill(client, signer, gas, wallet, amount).await,
            RefillAction::Overflow { amount } => self.overflow(client, signer, gas, wallet, amount).await,
            RefillAction::None => unreachable!(),
        };

        self.refilling = false;

        match outcome {
            Ok(()) => {
                self.last_success = Some(Instant::now());
                let _ = wallet.reconcile(client).await;
                Ok(Some(action))
            }
            Err(e) => {
                warn!(error = %e, "refill attempt failed");
                Ok(None)
            }
        }
    }

    async fn refill(
        &self,
        client: &RpcClient,
        signer: &WalletSigner,
        gas: &dyn GasStrategy,
        wallet: &mut WalletState,
        amount: U256,
    ) -> Result<()> {
        let token = wallet.token.as_ref().map(|t| t.address).unwrap_or(Address::ZERO);
        let mut request_amount = amount;

        if let Some(allowance_fn) = &self.config.allowance_fn {
            let args = substitute_args(&self.config.allowance_fn_args, signer.address(), request_amount, token);
            let out = self
                .vault
                .call_view(client, allowance_fn, &args)
                .await
                .map_err(CoreError::Chain)?;
            let allowance = out
                .first()
                .and_then(|v| v.as_uint())
                .map(|(v, _)| v)
                .unwrap_or(U256::ZERO);
            if allowance.is_zero() {
                return Err(CoreError::Refill("vault allowance is zero".into()));
            }
            request_amount = request_amount.min(allowance);
        }

        if let Some(target) = &self.config.check_contract_balance {
            let addr: Address = if target.eq_ignore_ascii_case("self") {
                self.vault.address
            } else {
                target
                    .parse()
                    .map_err(|_| CoreError::Refill(format!("invalid checkContractBalance target: {target}")))?
            };
            let balance = client
                .get_balance(addr, BlockNumberOrTag::Latest)
                .await
                .map_err(CoreError::Chain)?;
            if balance <= self.config.contract_dust_balance {
                return Err(CoreError::Refill("vault contract balance at or below dust threshold".into()));
            }
            request_amount = request_amount.min(balance);
        }

        let args = substitute_args(&self.config.withdraw_fn_args, signer.address(), request_amount, token);
        let data = self
            .vault
            .encode_mutating_call(&self.config.withdraw_fn, &args)
            .map_err(CoreError::Chain)?;

        self.submit_vault_tx(client, signer, gas, wallet, U256::ZERO, data, self.config.withdraw_gas_limit)
            .await?;
        info!(amount = %request_amount, "refill withdrawal submitted");
        Ok(())
    }

    async fn overflow(
        &self,
        client: &RpcClient,
        signer: &WalletSigner,
        gas: &dyn GasStrategy,
        wallet: &mut WalletState,
        amount: U256,
    ) -> Result<()> {
        let token = wallet.token.as_ref().map(|t| t.address).unwrap_or(Address::ZERO);

        let data = if let Some(deposit_fn) = &self.config.deposit_fn {
            let args = substitute_args(&self.config.deposit_fn_args, signer.address(), amount, token);
            self.vault.encode_mutating_call(deposit_fn, &args).map_err(CoreError::Chain)?
        } else {
            Bytes::new()
        };

        self.submit_vault_tx(client, signer, gas, wallet, amount, data, self.config.withdraw_gas_limit)
            .await?;
        info!(amount = %amount, "overflow deposit submitted");
        Ok(())
    }

    /// Sign, submit, and await a vault call's receipt, bumping
    /// `wallet.nonce` once the transaction is accepted. A revert
    /// (`receipt.status == false`) is treated as a failure.
    async fn submit_vault_tx(
        &self,
        client: &RpcClient,
        signer: &WalletSigner,
        gas: &dyn GasStrategy,
        wallet: &mut WalletState,
        value: U256,
        data: Bytes,
        gas_limit: u64,
    ) -> Result<()> {
        let gas_params = gas.resolve(client).await.map_err(CoreError::Chain)?;
        let params = BuildTxParams {
            to: self.vault.address.to_string(),
            value,
            nonce: wallet.nonce,
            data,
            gas_limit,
        };
        let signed = signer
            .build_and_sign(params, gas_params, gas)
            .await
            .map_err(CoreError::Chain)?;

        let submitted = client.send_raw_transaction(&signed.raw).await.map_err(CoreError::Chain)?;
        wallet.nonce += 1;

        let receipt = await_receipt(client, submitted).await.map_err(CoreError::Chain)?;
        if !receipt.status() {
            return Err(CoreError::Refill(format!("vault call reverted: {:?}", receipt.transaction_hash)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RefillConfig {
        RefillConfig {
            contract: Address::ZERO,
            abi: "[]".into(),
            trigger_balance: U256::from(1_000_000_000_000_000_000u128),
            overflow_balance: Some(U256::from(2_000_000_000_000_000_000u128)),
            request_amount: U256::from(1_000_000_000_000_000_000u128),
            cooldown_time: 3600,
            allowance_fn: None,
            allowance_fn_args: vec![],
            withdraw_fn: "withdraw".into(),
            withdraw_fn_args: vec![],
            withdraw_gas_limit: 200_000,
            deposit_fn: None,
            deposit_fn_args: vec![],
            check_contract_balance: None,
            contract_dust_balance: U256::from(1_000_000_000u64),
        }
    }

    #[test]
    fn triggers_refill_below_threshold() {
        let cfg = config();
        let action = decide_action(&cfg, U256::from(500_000_000_000_000_000u128), U256::ZERO, U256::ZERO);
        assert_eq!(action, RefillAction::Refill { amount: cfg.request_amount });
    }

    #[test]
    fn triggers_overflow_above_threshold() {
        let cfg = config();
        let balance = U256::from(3_000_000_000_000_000_000u128);
        let action = decide_action(&cfg, balance, U256::ZERO, U256::ZERO);
        assert_eq!(
            action,
            RefillAction::Overflow { amount: balance - cfg.overflow_balance.unwrap() }
        );
    }

    #[test]
    fn no_action_inside_the_band() {
        let cfg = config();
        let action = decide_action(&cfg, U256::from(1_500_000_000_000_000_000u128), U256::ZERO, U256::ZERO);
        assert_eq!(action, RefillAction::None);
    }

    #[test]
    fn queued_amount_and_liability_reduce_effective_balance() {
        let cfg = config();
        let action = decide_action(
            &cfg,
            U256::from(1_500_000_000_000_000_000u128),
            U256::from(600_000_000_000_000_000u128),
            U256::ZERO,
        );
        assert_eq!(action, RefillAction::Refill { amount: cfg.request_amount });
    }

    #[test]
    fn substitutes_known_placeholders() {
        let wallet = Address::repeat_byte(1);
        let token = Address::repeat_byte(2);
        let amount = U256::from(42u64);
        assert_eq!(substitute_arg("{walletAddr}", wallet, amount, token), DynSolValue::Address(wallet));
        assert_eq!(substitute_arg("{amount}", wallet, amount, token), DynSolValue::Uint(amount, 256));
        assert_eq!(substitute_arg("{token}", wallet, amount, token), DynSolValue::Address(token));
    }
}
