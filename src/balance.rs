//! Balance reads and sufficiency checks.
//!
//! Native balances come from `eth_getBalance`, token balances from a `balanceOf` call
//! against the asset's contract. Both are rescaled with the decimals recorded in the
//! network registry.
//!
//! Sufficiency for a native payment covers the amount plus the estimated fee of the
//! transfer. For a token payment only the token balance is compared; the native balance
//! needed to pay the fee is not checked, so a token payment can pass this check and still
//! be refused by the wallet for lack of gas.

use crate::errors::{PaymentError, Result};
use crate::gas::GasEstimator;
use crate::networks::AssetDescriptor;
use crate::provider::ProviderExt;
use crate::session::WalletSession;
use crate::token::{balance_of_request, decimals_request, decode_balance, decode_decimals};
use crate::types::BalanceCheck;
use crate::utils::{format_amount, lowercase_address, parse_amount};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Reads balances of the connected wallet's chain.
pub struct BalanceOracle {
    session: Arc<WalletSession>,
    gas: GasEstimator,
}

impl BalanceOracle {
    /// Creates an oracle over a session.
    pub fn new(session: Arc<WalletSession>) -> Self {
        let gas = GasEstimator::new(Arc::clone(&session));
        Self { session, gas }
    }

    /// Balance of `address` in `symbol`, as a decimal string.
    pub async fn get_balance(&self, chain_id: u64, symbol: &str, address: Address) -> Result<String> {
        let asset = self.resolve(chain_id, symbol)?;
        let raw = self.read_raw(chain_id, asset, address).await?;
        Ok(format_amount(raw, asset.decimals))
    }

    /// Whether `address` holds enough `symbol` to pay `amount`.
    #[instrument(skip(self))]
    pub async fn check_sufficient(
        &self,
        chain_id: u64,
        symbol: &str,
        address: Address,
        amount: &str,
    ) -> Result<BalanceCheck> {
        let asset = self.resolve(chain_id, symbol)?;
        let value = parse_amount(amount, asset.decimals)?;
        let balance = self.read_raw(chain_id, asset, address).await?;

        let required = if asset.is_native() {
            // Fee of sending the amount to ourselves; an unknown fee counts as zero.
            let estimate = self
                .gas
                .estimate(chain_id, symbol, amount, &lowercase_address(&address), address)
                .await;
            value.saturating_add(estimate.gas_fee_wei)
        } else {
            value
        };

        let check = BalanceCheck {
            sufficient: balance >= required,
            balance: format_amount(balance, asset.decimals),
            required: format_amount(required, asset.decimals),
        };
        debug!(sufficient = check.sufficient, balance = %check.balance, required = %check.required, "balance checked");
        Ok(check)
    }

    /// Decimals reported by the token contract itself.
    ///
    /// Native assets report the registry value. A contract disagreeing with the registry
    /// is logged; the registry stays authoritative for amount scaling.
    pub async fn token_decimals(&self, chain_id: u64, symbol: &str) -> Result<u8> {
        let asset = self.resolve(chain_id, symbol)?;
        if asset.is_native() {
            return Ok(asset.decimals);
        }
        self.require_chain(chain_id).await?;

        let output = self
            .session
            .provider()?
            .call(&decimals_request(asset.address))
            .await?;
        let decimals = decode_decimals(&output)?;
        if decimals != asset.decimals {
            warn!(chain_id, symbol, registry = asset.decimals, contract = decimals, "token decimals differ from registry");
        }
        Ok(decimals)
    }

    fn resolve(&self, chain_id: u64, symbol: &str) -> Result<&AssetDescriptor> {
        self.session
            .registry()
            .describe_asset(chain_id, symbol)
            .ok_or_else(|| PaymentError::UnsupportedCurrency {
                symbol: symbol.to_string(),
                chain_id,
            })
    }

    async fn read_raw(&self, chain_id: u64, asset: &AssetDescriptor, address: Address) -> Result<U256> {
        self.require_chain(chain_id).await?;
        let provider = self.session.provider()?;

        if asset.is_native() {
            provider.get_balance(address).await
        } else {
            let output = provider.call(&balance_of_request(asset.address, address)).await?;
            decode_balance(&output)
        }
    }

    /// Reads go to whatever chain the wallet is on, so it must be the one asked about.
    async fn require_chain(&self, chain_id: u64) -> Result<()> {
        let active = self.session.require_connected().await?.chain_id;
        if active != chain_id {
            return Err(PaymentError::NetworkMismatch {
                active,
                required: chain_id,
            });
        }
        Ok(())
    }
}
