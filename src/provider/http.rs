//! JSON-RPC over HTTP implementation of [`WalletProvider`].
//!
//! Talks to any endpoint that accepts wallet methods (`eth_sendTransaction`,
//! `wallet_switchEthereumChain`, ...) over plain HTTP: a node with unlocked accounts, or
//! a wallet bridge. HTTP has no push channel, so account/chain notifications are fed in
//! by the host through [`HttpWalletProvider::notify`].

use super::{ProviderEvent, RpcError, WalletProvider};
use crate::config::PaymentConfig;
use crate::errors::{PaymentError, Result};
use async_trait::async_trait;
use ethers::providers::{Http, HttpClientError, JsonRpcClient};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

/// Environment variable holding the wallet endpoint.
pub const WALLET_RPC_URL_ENV: &str = "WALLET_RPC_URL";

const EVENT_CAPACITY: usize = 16;

/// Wallet provider reached over HTTP JSON-RPC.
#[derive(Debug)]
pub struct HttpWalletProvider {
    endpoint: Url,
    http: Http,
    timeout: Duration,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpWalletProvider {
    /// Creates a provider for the given endpoint.
    ///
    /// Each request is bounded by `timeout`.
    ///
    /// # Examples
    ///
    /// ```
    /// use evm_pay::provider::HttpWalletProvider;
    /// use std::time::Duration;
    ///
    /// let provider = HttpWalletProvider::new("http://127.0.0.1:8545", Duration::from_secs(30)).unwrap();
    /// assert_eq!(provider.endpoint().as_str(), "http://127.0.0.1:8545/");
    /// ```
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PaymentError::Config(format!("Invalid wallet endpoint {}: {}", endpoint, e)))?;
        let http = Http::new(endpoint.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            endpoint,
            http,
            timeout,
            events,
        })
    }

    /// Builds a provider from `WALLET_RPC_URL`.
    ///
    /// Returns `Ok(None)` when the variable is unset, which callers treat as
    /// "no wallet present".
    pub fn from_env(config: &PaymentConfig) -> Result<Option<Self>> {
        match std::env::var(WALLET_RPC_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim(), config.rpc_timeout).map(Some),
            _ => Ok(None),
        }
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Publishes a wallet notification to every subscriber.
    pub fn notify(&self, event: ProviderEvent) {
        // No subscribers is not an error: nobody has connected yet.
        let _ = self.events.send(event);
    }
}

/// Keeps the wallet's own error code; transport and decode failures become internal errors.
fn to_rpc_error(method: &str, err: HttpClientError) -> RpcError {
    match err {
        HttpClientError::JsonRpcError(e) => RpcError::new(e.code, e.message),
        other => RpcError::transport(format!("{} request failed: {}", method, other)),
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
        tracing::trace!(method, endpoint = %self.endpoint, "wallet request");
        let call = self.http.request(method, params);
        let outcome: std::result::Result<std::result::Result<Value, HttpClientError>, _> =
            tokio::time::timeout(self.timeout, call).await;
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(to_rpc_error(method, e)),
            Err(_) => Err(RpcError::transport(format!(
                "{} timed out after {:?}",
                method, self.timeout
            ))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::INTERNAL_ERROR_CODE;
    use ethers::providers::JsonRpcError;

    #[test]
    fn test_rejects_bad_endpoint() {
        let err = HttpWalletProvider::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PaymentError::Config(_)));
    }

    #[tokio::test]
    async fn test_notify_reaches_subscribers() {
        let provider = HttpWalletProvider::new("http://127.0.0.1:8545", Duration::from_secs(1)).unwrap();
        let mut rx = provider.subscribe();
        provider.notify(ProviderEvent::ChainChanged(137));
        assert_eq!(rx.recv().await.unwrap(), ProviderEvent::ChainChanged(137));
    }

    #[test]
    fn test_wallet_error_keeps_code() {
        let err = to_rpc_error(
            "eth_sendTransaction",
            HttpClientError::JsonRpcError(JsonRpcError {
                code: 4001,
                message: "User rejected the request.".to_string(),
                data: None,
            }),
        );
        assert_eq!(err, RpcError::new(4001, "User rejected the request."));
        assert!(matches!(PaymentError::from(err), PaymentError::UserRejected));
    }

    #[test]
    fn test_decode_failure_is_transport_error() {
        let err = to_rpc_error(
            "eth_chainId",
            HttpClientError::SerdeJson {
                err: serde_json::from_str::<Value>("<html>").unwrap_err(),
                text: "<html>".to_string(),
            },
        );
        assert_eq!(err.code, INTERNAL_ERROR_CODE);
        assert!(err.message.starts_with("eth_chainId request failed"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on the discard port.
        let provider = HttpWalletProvider::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
        let err = provider.request("eth_chainId", serde_json::json!([])).await.unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR_CODE);
    }
}
