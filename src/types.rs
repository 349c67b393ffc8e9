//! Core value types of the payment subsystem.
//!
//! Requests, results and statuses are transient: one per call. They serialize with
//! camelCase field names so they can be handed straight to a JSON front end or backend.

use crate::errors::{PaymentError, PaymentFailure};
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// A payment the caller wants executed.
///
/// # Examples
///
/// ```
/// use evm_pay::types::PaymentRequest;
///
/// let request = PaymentRequest::new("1.5", "MATIC", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
///     .with_order(42);
/// assert_eq!(request.order_id, Some(42));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Decimal amount in whole units of the currency (e.g. `"1.5"`)
    pub amount: String,

    /// Currency symbol, resolved against the target chain's asset table
    pub currency: String,

    /// Recipient address as supplied; normalized before use
    #[serde(rename = "recipientAddress")]
    pub recipient_address: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Originating order reference
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
}

impl PaymentRequest {
    /// Creates a request without description or order reference.
    pub fn new(
        amount: impl Into<String>,
        currency: impl Into<String>,
        recipient_address: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            currency: currency.into(),
            recipient_address: recipient_address.into(),
            description: None,
            order_id: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the originating order reference.
    pub fn with_order(mut self, order_id: u64) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

/// Outcome of [`crate::executor::PaymentExecutor::process`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// Whether the transfer was submitted
    pub success: bool,

    /// Hash of the submitted transaction
    #[serde(rename = "transactionHash", skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<H256>,

    /// Categorized failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentFailure>,
}

impl PaymentResult {
    /// A submitted payment.
    pub fn submitted(transaction_hash: H256) -> Self {
        Self {
            success: true,
            transaction_hash: Some(transaction_hash),
            error: None,
        }
    }

    /// A payment that was not submitted.
    pub fn failed(error: PaymentError) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            error: Some(error.into()),
        }
    }
}

/// On-chain state of a transaction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    /// Known but not mined yet
    Pending,
    /// Mined with a success receipt
    Confirmed,
    /// Reverted, unknown, or given up on; see [`StatusReason`]
    Failed,
}

/// Why a status is `failed`.
///
/// `failed` covers three different situations; this tells them apart without
/// changing the status itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StatusReason {
    /// The receipt reports failure
    Reverted,
    /// The provider does not know the hash
    NotFound,
    /// The wait bound elapsed; the transaction may still confirm later
    TimedOut,
}

/// Status of a submitted transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    /// Transaction hash
    #[serde(rename = "txHash")]
    pub tx_hash: H256,

    /// State
    pub status: TxState,

    /// Blocks on top of (and including) the inclusion block
    pub confirmations: u64,

    /// Inclusion block
    #[serde(rename = "blockNumber", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,

    /// Gas used by the transaction
    #[serde(rename = "gasUsed", skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,

    /// Effective gas price paid
    #[serde(rename = "gasPrice", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,

    /// Reason for a `failed` status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
}

impl TransactionStatus {
    /// A transaction that is known but has no receipt yet.
    pub fn pending(tx_hash: H256) -> Self {
        Self {
            tx_hash,
            status: TxState::Pending,
            confirmations: 0,
            block_number: None,
            gas_used: None,
            gas_price: None,
            reason: None,
        }
    }

    /// A `failed` status with zero confirmations.
    pub fn failed(tx_hash: H256, reason: StatusReason) -> Self {
        Self {
            status: TxState::Failed,
            reason: Some(reason),
            ..Self::pending(tx_hash)
        }
    }

    /// Whether no further transition is expected.
    pub fn is_final(&self) -> bool {
        self.status != TxState::Pending
    }
}

/// Result of a balance sufficiency check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BalanceCheck {
    /// Whether the balance covers the requirement
    pub sufficient: bool,

    /// Current balance, decimal
    pub balance: String,

    /// Amount required, decimal (amount plus estimated gas for native payments)
    pub required: String,
}

/// Estimated native-currency fee of a transfer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GasEstimate {
    /// Fee in native currency, decimal; `"0"` when estimation failed
    #[serde(rename = "gasFee")]
    pub gas_fee: String,

    /// Fee in wei
    #[serde(rename = "gasFeeWei")]
    pub gas_fee_wei: U256,

    /// Estimation error; the fee should then be treated as unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GasEstimate {
    /// An estimate that could not be produced.
    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            gas_fee: "0".to_string(),
            gas_fee_wei: U256::zero(),
            error: Some(error.into()),
        }
    }
}

/// Active network as reported by the wallet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Chain id
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    /// Registry display name, or `"Unknown"`
    pub name: String,
}

/// Outcome of a network switch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SwitchResult {
    /// Whether the wallet is now on the target chain
    pub success: bool,

    /// Failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentFailure>,
}

impl SwitchResult {
    /// A successful switch.
    pub fn switched() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed switch.
    pub fn failed(error: PaymentError) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// What the backend verifier needs to check a submitted payment on-chain.
///
/// This crate only builds the document; delivering it is up to the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementHandoff {
    /// Submitted transaction
    pub tx_hash: H256,

    /// Chain it was submitted on
    pub chain_id: u64,

    /// Paying account
    pub from_address: Address,

    /// Recipient, normalized
    pub to_address: String,

    /// Decimal amount
    pub amount: String,

    /// Currency symbol
    pub currency: String,

    /// Originating order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,

    /// When the transfer was submitted
    pub submitted_at: DateTime<Utc>,
}

/// Verifier's answer about a handed-off payment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// Whether the verifier could check the transaction
    pub success: bool,

    /// Whether the payment is final
    pub confirmed: bool,

    /// Confirmations observed by the verifier
    pub confirmations: u64,

    /// Confirmations the verifier requires
    pub required_confirmations: u64,

    /// Verifier error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationReport {
    /// Confirmations still missing before the order is marked paid.
    pub fn remaining_confirmations(&self) -> u64 {
        self.required_confirmations.saturating_sub(self.confirmations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_payment_request_serialization() {
        let request = PaymentRequest::new("100", "USDT", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .with_description("Premium plan")
            .with_order(7);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["recipientAddress"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(json["orderId"], 7);

        let minimal: PaymentRequest = serde_json::from_value(json!({
            "amount": "1",
            "currency": "ETH",
            "recipientAddress": "0x00"
        }))
        .unwrap();
        assert!(minimal.description.is_none());
        assert!(minimal.order_id.is_none());
    }

    #[test]
    fn test_payment_result() {
        let ok = PaymentResult::submitted(H256::repeat_byte(0xab));
        assert!(ok.success);
        assert!(serde_json::to_string(&ok).unwrap().contains("transactionHash"));

        let failed = PaymentResult::failed(PaymentError::UserRejected);
        assert!(!failed.success);
        assert!(failed.transaction_hash.is_none());
        assert_eq!(failed.error.unwrap().kind, ErrorKind::UserRejected);
    }

    #[test]
    fn test_transaction_status_serialization() {
        let status = TransactionStatus::failed(H256::zero(), StatusReason::TimedOut);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["confirmations"], 0);
        assert_eq!(json["reason"], "timedOut");
        assert!(status.is_final());
        assert!(!TransactionStatus::pending(H256::zero()).is_final());
    }

    #[test]
    fn test_verification_report() {
        let report: VerificationReport = serde_json::from_value(json!({
            "success": true,
            "confirmed": false,
            "confirmations": 2,
            "requiredConfirmations": 12
        }))
        .unwrap();
        assert_eq!(report.remaining_confirmations(), 10);
    }
}
