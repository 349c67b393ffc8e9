//! Transaction status tracking.
//!
//! A status is derived from the transaction, its receipt and the chain head. The
//! confirmation count reported for a hash never decreases: a lower head seen from a
//! lagging node is replaced by the highest count already reported.
//!
//! That mark is kept per hash until the hash settles in a wait or watch. A hash that
//! never settles stays tracked until [`TransactionTracker::forget`] is called.

use crate::errors::{ErrorKind, Result};
use crate::provider::ProviderExt;
use crate::session::WalletSession;
use crate::types::{StatusReason, TransactionStatus, TxState};
use ethers::types::H256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

const WATCH_CAPACITY: usize = 8;

/// Polls the wallet for transaction status.
pub struct TransactionTracker {
    session: Arc<WalletSession>,
    high_water: RwLock<HashMap<H256, u64>>,
}

impl TransactionTracker {
    /// Creates a tracker over a session.
    pub fn new(session: Arc<WalletSession>) -> Self {
        Self {
            session,
            high_water: RwLock::new(HashMap::new()),
        }
    }

    /// Current status of `tx_hash`.
    ///
    /// A hash the provider does not know is reported as `failed` with reason
    /// [`StatusReason::NotFound`]; a known transaction without receipt is `pending`.
    pub async fn get_status(&self, tx_hash: H256) -> Result<TransactionStatus> {
        let provider = self.session.provider()?;

        if provider.get_transaction(tx_hash).await?.is_none() {
            return Ok(TransactionStatus::failed(tx_hash, StatusReason::NotFound));
        }
        let receipt = match provider.get_transaction_receipt(tx_hash).await? {
            Some(receipt) => receipt,
            None => return Ok(TransactionStatus::pending(tx_hash)),
        };
        let Some(block) = receipt.block_number.map(|n| n.as_u64()) else {
            return Ok(TransactionStatus::pending(tx_hash));
        };

        let head = provider.block_number().await?;
        let observed = head.saturating_sub(block) + 1;
        let confirmations = self.record_confirmations(tx_hash, observed).await;

        // Receipts without a status field predate Byzantium and only exist for successes.
        let reverted = receipt.status.map(|s| s.as_u64() == 0).unwrap_or(false);
        let (status, reason) = if reverted {
            (TxState::Failed, Some(StatusReason::Reverted))
        } else {
            (TxState::Confirmed, None)
        };

        Ok(TransactionStatus {
            tx_hash,
            status,
            confirmations,
            block_number: Some(block),
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price,
            reason,
        })
    }

    /// Polls until `tx_hash` has `required` confirmations, reverts, or `timeout` elapses.
    ///
    /// Elapsing is not an error: the result is `failed` with reason
    /// [`StatusReason::TimedOut`], and the transaction may still confirm later.
    #[instrument(skip(self))]
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        required: u64,
        timeout: Duration,
    ) -> Result<TransactionStatus> {
        let deadline = Instant::now() + timeout;
        let mut ticker = interval(self.session.config().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let poll = async {
            loop {
                ticker.tick().await;
                match self.poll_once(tx_hash, required).await {
                    Ok(Some(status)) => return Ok(status),
                    Ok(None) => {}
                    Err(e) => return Err(e),
                }
            }
        };

        match timeout_at(deadline, poll).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?tx_hash, ?timeout, "confirmation wait timed out");
                Ok(TransactionStatus::failed(tx_hash, StatusReason::TimedOut))
            }
        }
    }

    /// [`Self::wait_for_confirmation`] with the configured defaults.
    pub async fn wait(&self, tx_hash: H256) -> Result<TransactionStatus> {
        let config = self.session.config();
        self.wait_for_confirmation(tx_hash, config.required_confirmations, config.confirmation_timeout)
            .await
    }

    /// Streams status changes of `tx_hash` until it is final or `timeout` elapses.
    ///
    /// The last item is always final. Dropping the receiver stops the polling.
    pub fn watch(
        self: &Arc<Self>,
        tx_hash: H256,
        required: u64,
        timeout: Duration,
    ) -> mpsc::Receiver<TransactionStatus> {
        let (tx, rx) = mpsc::channel(WATCH_CAPACITY);
        let tracker = Arc::clone(self);

        tokio::spawn(async move {
            let deadline = Instant::now() + timeout;
            let mut ticker = interval(tracker.session.config().poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<TransactionStatus> = None;

            loop {
                let status = match timeout_at(deadline, async {
                    ticker.tick().await;
                    tracker.get_status(tx_hash).await
                })
                .await
                {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) if e.kind() == ErrorKind::ProviderError => {
                        warn!(?tx_hash, error = %e, "status poll failed, retrying");
                        continue;
                    }
                    Ok(Err(e)) => {
                        warn!(?tx_hash, error = %e, "stopped watching transaction");
                        break;
                    }
                    Err(_) => {
                        let _ = tx.send(TransactionStatus::failed(tx_hash, StatusReason::TimedOut)).await;
                        break;
                    }
                };

                let done = is_settled(&status, required);
                if last.as_ref() != Some(&status) || done {
                    last = Some(status.clone());
                    if tx.send(status).await.is_err() {
                        debug!(?tx_hash, "watcher dropped");
                        break;
                    }
                }
                if done {
                    tracker.forget(tx_hash).await;
                    break;
                }
            }
        });

        rx
    }

    async fn poll_once(&self, tx_hash: H256, required: u64) -> Result<Option<TransactionStatus>> {
        match self.get_status(tx_hash).await {
            Ok(status) if is_settled(&status, required) => {
                self.forget(tx_hash).await;
                info!(?tx_hash, status = ?status.status, confirmations = status.confirmations, "transaction settled");
                Ok(Some(status))
            }
            Ok(status) => {
                debug!(?tx_hash, status = ?status.status, confirmations = status.confirmations, "waiting");
                Ok(None)
            }
            // Transient provider trouble; keep polling until the deadline.
            Err(e) if e.kind() == ErrorKind::ProviderError => {
                warn!(?tx_hash, error = %e, "status poll failed, retrying");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Drops the confirmation mark kept for `tx_hash`.
    pub async fn forget(&self, tx_hash: H256) {
        self.high_water.write().await.remove(&tx_hash);
    }

    /// Number of hashes with a confirmation mark.
    pub async fn tracked_count(&self) -> usize {
        self.high_water.read().await.len()
    }

    async fn record_confirmations(&self, tx_hash: H256, observed: u64) -> u64 {
        let mut high_water = self.high_water.write().await;
        let entry = high_water.entry(tx_hash).or_insert(0);
        *entry = (*entry).max(observed);
        *entry
    }
}

/// Confirmed with enough confirmations, or reverted. A hash that is not found yet is
/// not settled: a freshly submitted transaction may not have propagated.
fn is_settled(status: &TransactionStatus, required: u64) -> bool {
    match status.status {
        TxState::Confirmed => status.confirmations >= required,
        TxState::Failed => status.reason == Some(StatusReason::Reverted),
        TxState::Pending => false,
    }
}
