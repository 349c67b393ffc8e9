//! Wallet session: the one connection between the subsystem and the user's wallet.
//!
//! The session caches the connected account and the active chain id. Wallet
//! notifications (`accountsChanged`, `chainChanged`) are applied by a background task
//! started on [`WalletSession::connect`], so the cache follows the wallet without polling.
//! Every other component reads the cache through a shared `Arc<WalletSession>`.

use crate::config::PaymentConfig;
use crate::errors::{PaymentError, Result};
use crate::networks::NetworkRegistry;
use crate::provider::{ProviderEvent, ProviderExt, WalletProvider};
use crate::switcher::request_switch;
use crate::types::NetworkInfo;
use ethers::types::Address;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Snapshot of the session cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Whether a wallet account is connected
    pub connected: bool,

    /// Connected account
    pub address: Option<Address>,

    /// Active chain as last reported by the wallet
    pub chain_id: Option<u64>,
}

/// Account and chain returned by [`WalletSession::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedWallet {
    /// Connected account
    pub address: Address,

    /// Active chain after connecting
    pub chain_id: u64,
}

/// Connection to an injected wallet.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    registry: Arc<NetworkRegistry>,
    config: PaymentConfig,
    state: Arc<RwLock<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletSession {
    /// Creates a disconnected session.
    ///
    /// `provider` is `None` when no wallet is present; every operation that needs one
    /// then fails with [`PaymentError::WalletNotFound`].
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        registry: Arc<NetworkRegistry>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
            state: Arc::new(RwLock::new(SessionState::default())),
            listener: Mutex::new(None),
        }
    }

    /// The wallet provider.
    pub fn provider(&self) -> Result<Arc<dyn WalletProvider>> {
        self.provider.clone().ok_or(PaymentError::WalletNotFound)
    }

    /// The network catalog shared by all components.
    pub fn registry(&self) -> &Arc<NetworkRegistry> {
        &self.registry
    }

    /// Runtime configuration.
    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Requests account access and caches the first account and the active chain.
    ///
    /// Reconnecting replaces the previous session. When a preferred chain is configured
    /// and differs from the active one, a switch is attempted; failure to switch is
    /// logged and does not fail the connection.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<ConnectedWallet> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await?;
        let address = *accounts.first().ok_or(PaymentError::NoAccounts)?;
        let mut chain_id = provider.chain_id().await?;

        // Subscribe before publishing the state so no notification is missed.
        self.start_listener(provider.as_ref());

        if let Some(preferred) = self.config.preferred_chain_id {
            if preferred != chain_id {
                match request_switch(provider.as_ref(), &self.registry, preferred).await {
                    Ok(()) => chain_id = preferred,
                    Err(e) => warn!(preferred, error = %e, "could not switch to preferred chain"),
                }
            }
        }

        *self.state.write().await = SessionState {
            connected: true,
            address: Some(address),
            chain_id: Some(chain_id),
        };

        info!(%address, chain_id, "wallet connected");
        Ok(ConnectedWallet { address, chain_id })
    }

    /// Refreshes the cache from `eth_accounts` without prompting the user.
    ///
    /// Returns the connected account, or `None` if the wallet exposes none.
    pub async fn check_connection(&self) -> Result<Option<Address>> {
        let provider = self.provider()?;
        let accounts = provider.accounts().await?;

        let mut state = self.state.write().await;
        match accounts.first() {
            Some(address) => {
                state.connected = true;
                state.address = Some(*address);
                if state.chain_id.is_none() {
                    state.chain_id = Some(provider.chain_id().await?);
                }
                Ok(Some(*address))
            }
            None => {
                *state = SessionState::default();
                Ok(None)
            }
        }
    }

    /// Reads the active chain from the wallet and names it from the registry.
    pub async fn current_network(&self) -> Result<NetworkInfo> {
        let chain_id = self.provider()?.chain_id().await?;
        self.state.write().await.chain_id = Some(chain_id);

        let name = self
            .registry
            .describe_network(chain_id)
            .map(|config| config.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        Ok(NetworkInfo { chain_id, name })
    }

    /// Drops the cached session and stops following wallet notifications.
    pub async fn disconnect(&self) {
        self.stop_listener();
        *self.state.write().await = SessionState::default();
        info!("wallet disconnected");
    }

    /// Applies a wallet notification to the cache.
    pub async fn apply_event(&self, event: ProviderEvent) {
        apply_event(&self.state, event).await;
    }

    /// Current cache contents.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Whether an account is connected.
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    /// Connected account.
    pub async fn address(&self) -> Option<Address> {
        self.state.read().await.address
    }

    /// Cached active chain.
    pub async fn chain_id(&self) -> Option<u64> {
        self.state.read().await.chain_id
    }

    /// Account and chain of a connected session.
    pub async fn require_connected(&self) -> Result<ConnectedWallet> {
        let state = self.state.read().await;
        match (state.connected, state.address, state.chain_id) {
            (true, Some(address), Some(chain_id)) => Ok(ConnectedWallet { address, chain_id }),
            _ => Err(PaymentError::ProviderUnavailable(
                "wallet is not connected".to_string(),
            )),
        }
    }

    pub(crate) async fn set_chain_id(&self, chain_id: u64) {
        self.state.write().await.chain_id = Some(chain_id);
    }

    fn start_listener(&self, provider: &dyn WalletProvider) {
        let mut events = provider.subscribe();
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => apply_event(&state, event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "wallet notifications dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn stop_listener(&self) {
        if let Some(handle) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

async fn apply_event(state: &RwLock<SessionState>, event: ProviderEvent) {
    let mut state = state.write().await;
    match event {
        ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
            Some(address) => {
                debug!(%address, "account changed");
                state.connected = true;
                state.address = Some(*address);
            }
            None => {
                info!("wallet exposed no accounts, session disconnected");
                state.connected = false;
                state.address = None;
            }
        },
        ProviderEvent::ChainChanged(chain_id) => {
            debug!(chain_id, "chain changed");
            state.chain_id = Some(chain_id);
        }
    }
}
