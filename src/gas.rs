//! Fee estimation for a prospective transfer.

use crate::errors::{PaymentError, Result};
use crate::networks::AssetDescriptor;
use crate::provider::ProviderExt;
use crate::session::WalletSession;
use crate::token::transfer_request;
use crate::types::GasEstimate;
use crate::utils::{format_amount, normalize_address, parse_amount};
use ethers::types::{Address, TransactionRequest, U256};
use std::sync::Arc;
use tracing::{debug, warn};

/// Estimates the native-currency fee of a payment.
pub struct GasEstimator {
    session: Arc<WalletSession>,
}

impl GasEstimator {
    /// Creates an estimator over a session.
    pub fn new(session: Arc<WalletSession>) -> Self {
        Self { session }
    }

    /// Estimated fee of transferring `amount` of `symbol` from `from` to `recipient`.
    ///
    /// Never fails: when the provider cannot estimate, the result carries the error and
    /// a zero fee, and callers should treat the fee as unknown.
    pub async fn estimate(
        &self,
        chain_id: u64,
        symbol: &str,
        amount: &str,
        recipient: &str,
        from: Address,
    ) -> GasEstimate {
        match self.estimate_wei(chain_id, symbol, amount, recipient, from).await {
            Ok(fee) => {
                let decimals = self
                    .session
                    .registry()
                    .describe_network(chain_id)
                    .map(|config| config.native_currency.decimals)
                    .unwrap_or(18);
                GasEstimate {
                    gas_fee: format_amount(fee, decimals),
                    gas_fee_wei: fee,
                    error: None,
                }
            }
            Err(e) => {
                warn!(chain_id, symbol, error = %e, "gas estimation failed");
                GasEstimate::unknown(e.to_string())
            }
        }
    }

    /// Fee in wei, propagating every failure.
    pub async fn estimate_wei(
        &self,
        chain_id: u64,
        symbol: &str,
        amount: &str,
        recipient: &str,
        from: Address,
    ) -> Result<U256> {
        let asset = self
            .session
            .registry()
            .describe_asset(chain_id, symbol)
            .ok_or_else(|| PaymentError::UnsupportedCurrency {
                symbol: symbol.to_string(),
                chain_id,
            })?;
        let value = parse_amount(amount, asset.decimals)?;
        let recipient = normalize_address(recipient)?.address;

        let tx = transfer_transaction(asset, from, recipient, value);
        let provider = self.session.provider()?;
        let gas = provider.estimate_gas(&tx).await?;
        let gas_price = provider.gas_price().await?;

        let fee = gas
            .checked_mul(gas_price)
            .ok_or_else(|| PaymentError::GasEstimationFailed("fee overflows 256 bits".to_string()))?;
        debug!(%gas, %gas_price, %fee, "estimated fee");
        Ok(fee)
    }
}

/// The transaction a payment of `value` submits: a value transfer for native assets,
/// a `transfer` call for tokens.
pub(crate) fn transfer_transaction(
    asset: &AssetDescriptor,
    from: Address,
    recipient: Address,
    value: U256,
) -> TransactionRequest {
    if asset.is_native() {
        TransactionRequest::new().from(from).to(recipient).value(value)
    } else {
        transfer_request(from, asset.address, recipient, value)
    }
}
