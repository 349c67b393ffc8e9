//! Payment execution.
//!
//! [`PaymentExecutor::process`] validates a [`PaymentRequest`] locally, checks the
//! session and the balance, then asks the wallet to sign and submit the transfer. It
//! returns once the transaction is submitted; confirmation is the tracker's job.
//!
//! The order of checks matters: currency and amount are validated before any provider
//! call, so a malformed request never reaches the wallet.

use crate::balance::BalanceOracle;
use crate::errors::{PaymentError, Result};
use crate::gas::transfer_transaction;
use crate::provider::ProviderExt;
use crate::session::WalletSession;
use crate::types::{PaymentRequest, PaymentResult, SettlementHandoff};
use crate::utils::{normalize_address, parse_amount};
use chrono::Utc;
use ethers::types::{Address, H256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Submits payments through the connected wallet.
pub struct PaymentExecutor {
    session: Arc<WalletSession>,
    balances: BalanceOracle,
}

impl PaymentExecutor {
    /// Creates an executor over a session.
    pub fn new(session: Arc<WalletSession>) -> Self {
        let balances = BalanceOracle::new(Arc::clone(&session));
        Self { session, balances }
    }

    /// Validates, checks and submits a payment on `chain_id`.
    ///
    /// Never returns an error: every failure is categorized in the result.
    #[instrument(skip(self, request), fields(currency = %request.currency, amount = %request.amount, order_id = ?request.order_id))]
    pub async fn process(&self, request: &PaymentRequest, chain_id: u64) -> PaymentResult {
        match self.submit(request, chain_id).await {
            Ok(tx_hash) => {
                info!(?tx_hash, "payment submitted");
                PaymentResult::submitted(tx_hash)
            }
            Err(e) => {
                warn!(error = %e, "payment failed");
                PaymentResult::failed(e)
            }
        }
    }

    /// Document for the backend verifier describing a submitted payment.
    pub async fn handoff(
        &self,
        request: &PaymentRequest,
        chain_id: u64,
        tx_hash: H256,
    ) -> Result<SettlementHandoff> {
        let from_address = self.session.require_connected().await?.address;
        let to_address = normalize_address(&request.recipient_address)?.formatted;

        Ok(SettlementHandoff {
            tx_hash,
            chain_id,
            from_address,
            to_address,
            amount: request.amount.clone(),
            currency: request.currency.clone(),
            order_id: request.order_id,
            submitted_at: Utc::now(),
        })
    }

    async fn submit(&self, request: &PaymentRequest, chain_id: u64) -> Result<H256> {
        let registry = self.session.registry();
        if !registry.is_supported(chain_id) {
            return Err(PaymentError::UnsupportedNetwork(chain_id));
        }
        let asset = registry
            .describe_asset(chain_id, &request.currency)
            .ok_or_else(|| PaymentError::UnsupportedCurrency {
                symbol: request.currency.clone(),
                chain_id,
            })?;
        let value = parse_amount(&request.amount, asset.decimals)?;
        let recipient = normalize_address(&request.recipient_address)?;
        debug!(recipient = %recipient.formatted, "recipient normalized");

        let wallet = self.session.require_connected().await?;
        if wallet.chain_id != chain_id {
            return Err(PaymentError::NetworkMismatch {
                active: wallet.chain_id,
                required: chain_id,
            });
        }

        let check = self
            .balances
            .check_sufficient(chain_id, &asset.symbol, wallet.address, &request.amount)
            .await?;
        if !check.sufficient {
            let fee_note = if asset.is_native() { " including gas" } else { "" };
            return Err(PaymentError::InsufficientBalance(format!(
                "You have {} {}, but need {} {}{}",
                check.balance, asset.symbol, check.required, asset.symbol, fee_note
            )));
        }

        // The wallet may have switched account or chain while the balance was read.
        self.ensure_unchanged(wallet.address, chain_id).await?;

        let tx = transfer_transaction(asset, wallet.address, recipient.address, value);
        let provider = self.session.provider()?;
        provider.send_transaction(&tx).await
    }

    async fn ensure_unchanged(&self, address: Address, chain_id: u64) -> Result<()> {
        let current = self.session.require_connected().await?;
        if current.address != address || current.chain_id != chain_id {
            return Err(PaymentError::ProviderUnavailable(
                "wallet account or chain changed during payment".to_string(),
            ));
        }
        Ok(())
    }
}
