//! # evm-pay
//!
//! On-chain payment execution for EVM networks through an injected wallet.
//!
//! The crate turns a payment intent (amount, currency, recipient, target chain) into a
//! signed and submitted transfer and then tracks it to confirmation. Keys never touch
//! this crate: signing and submission are delegated to an EIP-1193 style
//! [`provider::WalletProvider`].
//!
//! ## Features
//!
//! - **Network registry**: Ethereum, BNB Smart Chain, Polygon and their test networks,
//!   with the native currency and ERC-20 tokens accepted on each
//! - **Wallet session**: account and chain cache kept current from wallet notifications
//! - **Pre-flight checks**: amount parsing in base units, address normalization,
//!   balance sufficiency including the gas fee for native payments
//! - **Dispatch**: native value transfers and ERC-20 `transfer` calls
//! - **Tracking**: receipt polling with monotonic confirmation counts and a bounded wait
//! - **Network switching**: registers unknown chains with the wallet before switching
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evm_pay::{
//!     HttpWalletProvider, NetworkRegistry, PaymentConfig, PaymentExecutor, PaymentRequest,
//!     TransactionTracker, WalletSession,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PaymentConfig::from_env()?;
//! let provider = HttpWalletProvider::new("http://127.0.0.1:8545", config.rpc_timeout)?;
//! let session = Arc::new(WalletSession::new(
//!     Some(Arc::new(provider)),
//!     Arc::new(NetworkRegistry::default()),
//!     config,
//! ));
//! session.connect().await?;
//!
//! let executor = PaymentExecutor::new(Arc::clone(&session));
//! let request = PaymentRequest::new("1.5", "MATIC", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
//! let result = executor.process(&request, 137).await;
//!
//! if let Some(tx_hash) = result.transaction_hash {
//!     let tracker = TransactionTracker::new(session);
//!     let status = tracker.wait(tx_hash).await?;
//!     println!("{:?} with {} confirmations", status.status, status.confirmations);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Payment Flow
//!
//! 1. **Resolve**: the currency is looked up in the target chain's asset table
//! 2. **Validate**: the amount is parsed at the asset's precision, the recipient normalized
//! 3. **Check session**: the wallet must be connected and on the target chain
//! 4. **Check balance**: native payments must also cover the estimated fee
//! 5. **Submit**: the wallet signs and broadcasts; the hash is returned
//! 6. **Track**: the tracker polls until enough confirmations or the wait bound
//!
//! Settlement verification by a backend is outside this crate; it only builds the
//! [`types::SettlementHandoff`] document.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod balance;
pub mod config;
pub mod errors;
pub mod executor;
pub mod gas;
pub mod networks;
pub mod provider;
pub mod session;
pub mod switcher;
pub mod token;
pub mod tracker;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use balance::BalanceOracle;
pub use config::PaymentConfig;
pub use errors::{ErrorKind, PaymentError, PaymentFailure, Result};
pub use executor::PaymentExecutor;
pub use gas::GasEstimator;
pub use networks::{AssetDescriptor, NetworkConfig, NetworkRegistry};
pub use provider::{HttpWalletProvider, ProviderEvent, ProviderExt, RpcError, WalletProvider};
pub use session::{ConnectedWallet, SessionState, WalletSession};
pub use switcher::NetworkSwitcher;
pub use tracker::TransactionTracker;
pub use types::{
    BalanceCheck, GasEstimate, NetworkInfo, PaymentRequest, PaymentResult, SettlementHandoff,
    StatusReason, SwitchResult, TransactionStatus, TxState, VerificationReport,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_module_accessibility() {
        let registry = Arc::new(NetworkRegistry::default());
        let session = Arc::new(WalletSession::new(None, registry, PaymentConfig::default()));

        let _ = PaymentExecutor::new(Arc::clone(&session));
        let _ = BalanceOracle::new(Arc::clone(&session));
        let _ = GasEstimator::new(Arc::clone(&session));
        let _ = TransactionTracker::new(Arc::clone(&session));
        let _ = NetworkSwitcher::new(session);
    }

    #[tokio::test]
    async fn test_no_wallet_fails_cleanly() {
        let session = Arc::new(WalletSession::new(
            None,
            Arc::new(NetworkRegistry::default()),
            PaymentConfig::default(),
        ));
        let switch = NetworkSwitcher::new(session).switch_to(137).await;
        assert!(!switch.success);
        assert_eq!(switch.error.unwrap().kind, ErrorKind::WalletNotFound);
    }
}
