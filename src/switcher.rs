//! Moving the wallet to another chain.
//!
//! A switch the wallet refuses because it does not know the chain (EIP-1193 code 4902)
//! is answered by registering the chain from the registry and switching again. Any other
//! refusal, user rejection included, ends the attempt.

use crate::errors::{PaymentError, Result};
use crate::networks::NetworkRegistry;
use crate::provider::{AddChainParameter, ProviderExt, WalletProvider};
use crate::session::WalletSession;
use crate::types::SwitchResult;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Switches the connected wallet between registry chains.
pub struct NetworkSwitcher {
    session: Arc<WalletSession>,
}

impl NetworkSwitcher {
    /// Creates a switcher over a session.
    pub fn new(session: Arc<WalletSession>) -> Self {
        Self { session }
    }

    /// Asks the wallet to make `chain_id` active.
    ///
    /// On success the session's cached chain is updated right away, without waiting
    /// for the wallet's `chainChanged` notification.
    #[instrument(skip(self))]
    pub async fn switch_to(&self, chain_id: u64) -> SwitchResult {
        let outcome = match self.session.provider() {
            Ok(provider) => request_switch(provider.as_ref(), self.session.registry(), chain_id).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.session.set_chain_id(chain_id).await;
                info!(chain_id, "switched network");
                SwitchResult::switched()
            }
            Err(e) => {
                warn!(chain_id, error = %e, "network switch failed");
                SwitchResult::failed(e)
            }
        }
    }
}

/// `wallet_switchEthereumChain`, registering the chain first if the wallet lacks it.
pub(crate) async fn request_switch(
    provider: &dyn WalletProvider,
    registry: &NetworkRegistry,
    chain_id: u64,
) -> Result<()> {
    let config = registry
        .describe_network(chain_id)
        .ok_or(PaymentError::UnsupportedNetwork(chain_id))?;

    match provider.switch_chain(chain_id).await {
        Ok(()) => Ok(()),
        Err(PaymentError::UnrecognizedChain(message)) => {
            info!(chain_id, %message, "wallet does not know chain, adding it");
            provider.add_chain(&AddChainParameter::from(config)).await?;
            provider.switch_chain(chain_id).await
        }
        Err(e) => Err(e),
    }
}
