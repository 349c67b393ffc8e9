//! The injected wallet provider seam.
//!
//! A [`WalletProvider`] is the EIP-1193 style request/response surface exposed by an
//! external wallet: it answers JSON-RPC methods, signs and submits transactions on the
//! user's behalf, and pushes account/chain change notifications. The payment subsystem
//! never holds keys; it only drives this capability.
//!
//! [`ProviderExt`] layers typed wrappers over the raw `request` call for every method the
//! subsystem needs.

pub mod http;

use crate::errors::Result;
use crate::networks::NetworkConfig;
use crate::utils::chain_id_hex;
use async_trait::async_trait;
use ethers::types::{
    Address, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256, U256, U64,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;

pub use http::HttpWalletProvider;

/// JSON-RPC "internal error", used for transport failures that carry no provider code.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Error object returned by the provider for a failed request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// EIP-1193 / JSON-RPC error code
    pub code: i64,

    /// Provider message
    pub message: String,
}

impl RpcError {
    /// Creates an error with an explicit code.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an error for a failure below the JSON-RPC layer.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR_CODE, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

/// Notification pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The exposed accounts changed; empty means the user disconnected
    AccountsChanged(Vec<Address>),

    /// The active chain changed
    ChainChanged(u64),
}

impl ProviderEvent {
    /// Parses an EIP-1193 notification (`accountsChanged` / `chainChanged`).
    ///
    /// Returns `None` for other events or malformed payloads.
    pub fn from_notification(event: &str, payload: &Value) -> Option<Self> {
        match event {
            "accountsChanged" => {
                let accounts = serde_json::from_value::<Vec<Address>>(payload.clone()).ok()?;
                Some(ProviderEvent::AccountsChanged(accounts))
            }
            "chainChanged" => parse_chain_id(payload).map(ProviderEvent::ChainChanged),
            _ => None,
        }
    }
}

/// Reads a chain id given either as a hex quantity string or a JSON number.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

/// Request/response surface of an injected wallet.
///
/// Implementations must be cheap to share: one provider instance serves every
/// component of a session.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Sends one JSON-RPC request and returns its raw result.
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError>;

    /// Subscribes to account/chain change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Parameter object of `wallet_addEthereumChain`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParameter {
    /// Hex chain id
    pub chain_id: String,

    /// Display name
    pub chain_name: String,

    /// Native currency
    pub native_currency: AddChainCurrency,

    /// RPC endpoints
    pub rpc_urls: Vec<String>,

    /// Explorer URLs
    pub block_explorer_urls: Vec<String>,
}

/// Native currency block of [`AddChainParameter`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddChainCurrency {
    /// Display name
    pub name: String,

    /// Ticker symbol
    pub symbol: String,

    /// Decimal precision
    pub decimals: u8,
}

impl From<&NetworkConfig> for AddChainParameter {
    fn from(config: &NetworkConfig) -> Self {
        AddChainParameter {
            chain_id: chain_id_hex(config.chain_id),
            chain_name: config.name.clone(),
            native_currency: AddChainCurrency {
                name: config.native_currency.name.clone(),
                symbol: config.native_currency.symbol.clone(),
                decimals: config.native_currency.decimals,
            },
            rpc_urls: config.rpc_urls.clone(),
            block_explorer_urls: config.block_explorer_urls.clone(),
        }
    }
}

/// Typed wrappers over [`WalletProvider::request`].
///
/// Provider errors are classified into [`crate::errors::PaymentError`] on the way out.
#[async_trait]
pub trait ProviderExt: WalletProvider {
    /// Sends a request and deserializes its result.
    async fn call_typed<R: DeserializeOwned + Send>(&self, method: &str, params: Value) -> Result<R> {
        let raw = self.request(method, params).await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// `eth_requestAccounts`: prompts the user for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.call_typed("eth_requestAccounts", json!([])).await
    }

    /// `eth_accounts`: accounts already exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>> {
        self.call_typed("eth_accounts", json!([])).await
    }

    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.call_typed("eth_chainId", json!([])).await?;
        Ok(id.as_u64())
    }

    /// `eth_getBalance` at the latest block.
    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.call_typed("eth_getBalance", json!([address, "latest"]))
            .await
    }

    /// `eth_estimateGas`.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        self.call_typed("eth_estimateGas", json!([tx])).await
    }

    /// `eth_gasPrice`.
    async fn gas_price(&self) -> Result<U256> {
        self.call_typed("eth_gasPrice", json!([])).await
    }

    /// `eth_call` at the latest block.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.call_typed("eth_call", json!([tx, "latest"])).await
    }

    /// `eth_sendTransaction`: the wallet signs and submits.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        self.call_typed("eth_sendTransaction", json!([tx])).await
    }

    /// `eth_getTransactionByHash`.
    async fn get_transaction(&self, hash: H256) -> Result<Option<Transaction>> {
        self.call_typed("eth_getTransactionByHash", json!([hash]))
            .await
    }

    /// `eth_getTransactionReceipt`.
    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.call_typed("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    /// `eth_blockNumber`.
    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.call_typed("eth_blockNumber", json!([])).await?;
        Ok(number.as_u64())
    }

    /// `wallet_switchEthereumChain`.
    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id_hex(chain_id) }]),
        )
        .await?;
        Ok(())
    }

    /// `wallet_addEthereumChain`.
    async fn add_chain(&self, parameter: &AddChainParameter) -> Result<()> {
        self.request("wallet_addEthereumChain", json!([parameter]))
            .await?;
        Ok(())
    }
}

impl<P: WalletProvider + ?Sized> ProviderExt for P {}
