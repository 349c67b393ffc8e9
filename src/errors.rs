//! Error types for the evm-pay library.
//!
//! Every failure the payment subsystem can report is a [`PaymentError`]. Internally the
//! modules propagate it with `?`; at the public payment and tracking boundary it is
//! flattened into a serializable [`PaymentFailure`] so that no error escapes as a raw
//! provider exception.

use crate::provider::RpcError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 / MetaMask code for a chain the wallet does not know about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Main error type for payment operations.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// No injected wallet provider is present
    #[error("Wallet provider not found")]
    WalletNotFound,

    /// Provider is present but exposed no accounts
    #[error("No accounts found")]
    NoAccounts,

    /// No connected session to read from or sign with
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Chain id is not in the network registry
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(u64),

    /// Symbol is not in the asset table of the chain
    #[error("Unsupported currency {symbol} on chain {chain_id}")]
    UnsupportedCurrency {
        /// Requested symbol
        symbol: String,
        /// Chain that was searched
        chain_id: u64,
    },

    /// Wallet is connected to a different chain than the payment targets
    #[error("Wallet is on chain {active}, payment requires chain {required}")]
    NetworkMismatch {
        /// Chain the wallet is on
        active: u64,
        /// Chain the payment requires
        required: u64,
    },

    /// Amount did not parse to a positive decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Recipient could not be parsed as an address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Balance does not cover the payment
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Gas or fee data could not be estimated
    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    /// The signer declined the request
    #[error("Transaction was rejected by user")]
    UserRejected,

    /// The wallet does not know the requested chain
    #[error("Unrecognized chain: {0}")]
    UnrecognizedChain(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other provider-reported failure
    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Result type alias for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Flat category of a [`PaymentError`], suitable for serialization and matching by callers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// See [`PaymentError::WalletNotFound`]
    WalletNotFound,
    /// See [`PaymentError::NoAccounts`]
    NoAccounts,
    /// See [`PaymentError::ProviderUnavailable`]
    ProviderUnavailable,
    /// See [`PaymentError::UnsupportedNetwork`]
    UnsupportedNetwork,
    /// See [`PaymentError::NetworkMismatch`]
    NetworkMismatch,
    /// See [`PaymentError::UnsupportedCurrency`]
    UnsupportedCurrency,
    /// See [`PaymentError::InvalidAmount`] and [`PaymentError::InvalidAddress`]
    InvalidRequest,
    /// See [`PaymentError::InsufficientBalance`]
    InsufficientBalance,
    /// See [`PaymentError::GasEstimationFailed`]
    GasEstimationFailed,
    /// See [`PaymentError::UserRejected`]
    UserRejected,
    /// Everything else
    ProviderError,
}

impl ErrorKind {
    /// Whether the caller may let the user retry the same request.
    ///
    /// Configuration mismatches (unknown network or currency) are setup errors and
    /// should not be retried identically. A wallet on the wrong chain is recoverable
    /// after a switch.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::UserRejected
                | ErrorKind::InsufficientBalance
                | ErrorKind::GasEstimationFailed
                | ErrorKind::ProviderError
                | ErrorKind::NoAccounts
                | ErrorKind::NetworkMismatch
        )
    }
}

impl PaymentError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::WalletNotFound => ErrorKind::WalletNotFound,
            PaymentError::NoAccounts => ErrorKind::NoAccounts,
            PaymentError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            PaymentError::UnsupportedNetwork(_) => ErrorKind::UnsupportedNetwork,
            PaymentError::NetworkMismatch { .. } => ErrorKind::NetworkMismatch,
            PaymentError::UnsupportedCurrency { .. } => ErrorKind::UnsupportedCurrency,
            PaymentError::InvalidAmount(_) | PaymentError::InvalidAddress(_) => {
                ErrorKind::InvalidRequest
            }
            PaymentError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            PaymentError::GasEstimationFailed(_) => ErrorKind::GasEstimationFailed,
            PaymentError::UserRejected => ErrorKind::UserRejected,
            PaymentError::UnrecognizedChain(_)
            | PaymentError::Config(_)
            | PaymentError::Json(_)
            | PaymentError::ProviderError(_) => ErrorKind::ProviderError,
        }
    }
}

/// Serializable failure carried by result types at the public boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentFailure {
    /// Error category
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,
}

impl From<PaymentError> for PaymentFailure {
    fn from(err: PaymentError) -> Self {
        PaymentFailure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<RpcError> for PaymentError {
    fn from(err: RpcError) -> Self {
        if err.code == USER_REJECTED_CODE {
            return PaymentError::UserRejected;
        }
        if err.code == UNRECOGNIZED_CHAIN_CODE {
            return PaymentError::UnrecognizedChain(err.message);
        }

        let message = err.message.to_lowercase();
        if message.contains("user rejected") || message.contains("user denied") {
            PaymentError::UserRejected
        } else if message.contains("unrecognized chain") {
            PaymentError::UnrecognizedChain(err.message)
        } else if message.contains("insufficient funds") {
            PaymentError::InsufficientBalance(err.message)
        } else if message.contains("gas required exceeds")
            || message.contains("cannot estimate gas")
            || message.contains("execution reverted")
            || message.contains("intrinsic gas too low")
        {
            PaymentError::GasEstimationFailed(err.message)
        } else {
            PaymentError::ProviderError(err.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i64, message: &str) -> RpcError {
        RpcError {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = PaymentError::UnsupportedCurrency {
            symbol: "DOGE".to_string(),
            chain_id: 137,
        };
        assert_eq!(err.to_string(), "Unsupported currency DOGE on chain 137");
    }

    #[test]
    fn test_rpc_error_classification() {
        assert!(matches!(
            PaymentError::from(rpc(4001, "User rejected the request.")),
            PaymentError::UserRejected
        ));
        assert!(matches!(
            PaymentError::from(rpc(4902, "Unrecognized chain ID \"0x13882\"")),
            PaymentError::UnrecognizedChain(_)
        ));
        assert!(matches!(
            PaymentError::from(rpc(-32603, "Unrecognized chain ID \"0x13882\". Try adding the chain")),
            PaymentError::UnrecognizedChain(_)
        ));
        assert!(matches!(
            PaymentError::from(rpc(-32000, "insufficient funds for gas * price + value")),
            PaymentError::InsufficientBalance(_)
        ));
        assert!(matches!(
            PaymentError::from(rpc(-32000, "gas required exceeds allowance (30000000)")),
            PaymentError::GasEstimationFailed(_)
        ));
        assert!(matches!(
            PaymentError::from(rpc(-32603, "nonce too low")),
            PaymentError::ProviderError(_)
        ));
    }

    #[test]
    fn test_failure_conversion() {
        let failure = PaymentFailure::from(PaymentError::UserRejected);
        assert_eq!(failure.kind, ErrorKind::UserRejected);
        assert!(failure.kind.is_recoverable());

        let failure = PaymentFailure::from(PaymentError::UnsupportedNetwork(5));
        assert_eq!(failure.kind, ErrorKind::UnsupportedNetwork);
        assert!(!failure.kind.is_recoverable());
    }

    #[test]
    fn test_network_mismatch_is_recoverable() {
        let failure = PaymentFailure::from(PaymentError::NetworkMismatch {
            active: 1,
            required: 137,
        });
        assert_eq!(failure.kind, ErrorKind::NetworkMismatch);
        assert!(failure.kind.is_recoverable());
        assert_eq!(
            serde_json::to_value(failure.kind).unwrap(),
            serde_json::json!("NETWORK_MISMATCH")
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: PaymentError = json_err.into();
        assert!(matches!(err, PaymentError::Json(_)));
        assert_eq!(err.kind(), ErrorKind::ProviderError);
    }
}
