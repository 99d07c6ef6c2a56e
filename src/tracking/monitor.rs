use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::gauge;
use serde::Serialize;
use tokio::sync::Mutex;

use super::registry::{normalize_address, TrackError, TrackingRegistry};
use super::source::TradeSource;
use super::state::WalletPollState;
use crate::models::{SubscriberId, TradeRecord};
use crate::polymarket::DataClientError;

/// Subscriptions plus per-wallet poll state behind a single lock.
///
/// Track/untrack calls from the front-end and the poll scheduler both go
/// through here. The lock is never held across a Trade Source request.
#[derive(Clone)]
pub struct WalletMonitor {
    inner: Arc<Mutex<MonitorInner>>,
    source: Arc<dyn TradeSource>,
}

#[derive(Default)]
struct MonitorInner {
    registry: TrackingRegistry,
    /// A tracked wallet without an entry is still waiting for its seed snapshot.
    states: HashMap<String, WalletPollState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackOutcome {
    pub wallet: String,
    pub already_tracked: bool,
}

impl WalletMonitor {
    pub fn new(source: Arc<dyn TradeSource>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorInner::default())),
            source,
        }
    }

    /// Subscribe `subscriber` to `wallet`. Idempotent.
    ///
    /// The first subscription to a wallet seeds its poll state from the current
    /// snapshot so existing history is never alerted on. If that fetch fails
    /// the wallet stays tracked and the scheduler seeds it on its next tick.
    pub async fn track(
        &self,
        subscriber: SubscriberId,
        wallet: &str,
    ) -> Result<TrackOutcome, TrackError> {
        let wallet = normalize_address(wallet)?;

        let (added, needs_seed) = {
            let mut inner = self.inner.lock().await;
            if !inner.registry.is_tracked(&wallet) {
                // State left over from before an untrack is not pruned yet.
                inner.states.remove(&wallet);
            }
            let added = inner.registry.track(subscriber, &wallet);
            let needs_seed = !inner.states.contains_key(&wallet);
            inner.publish_gauges();
            (added, needs_seed)
        };

        if added {
            tracing::info!(subscriber, wallet = %wallet, "Tracking started");
        }

        if needs_seed {
            self.seed(&wallet).await;
        }

        Ok(TrackOutcome {
            wallet,
            already_tracked: !added,
        })
    }

    /// Returns whether the subscription existed. Poll state is dropped lazily
    /// by [`WalletMonitor::poll_universe`].
    pub async fn untrack(&self, subscriber: SubscriberId, wallet: &str) -> Result<bool, TrackError> {
        let wallet = normalize_address(wallet)?;

        let mut inner = self.inner.lock().await;
        let removed = inner.registry.untrack(subscriber, &wallet);
        inner.publish_gauges();

        if removed {
            tracing::info!(subscriber, wallet = %wallet, "Tracking stopped");
        }
        Ok(removed)
    }

    /// Wallets tracked by `subscriber`, sorted.
    pub async fn list_tracked(&self, subscriber: SubscriberId) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut wallets: Vec<String> = inner.registry.list_wallets(subscriber).into_iter().collect();
        wallets.sort();
        wallets
    }

    pub async fn list_subscribers(&self, wallet: &str) -> HashSet<SubscriberId> {
        self.inner.lock().await.registry.list_subscribers(wallet)
    }

    /// The wallets to poll this tick. Also forgets poll state of wallets
    /// nobody tracks anymore, so a later re-subscription re-seeds.
    pub async fn poll_universe(&self) -> Vec<String> {
        let mut inner = self.inner.lock().await;
        let tracked = inner.registry.all_tracked_wallets();

        let before = inner.states.len();
        inner.states.retain(|wallet, _| tracked.contains(wallet));
        let pruned = before - inner.states.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped poll state of untracked wallets");
        }

        tracked.into_iter().collect()
    }

    /// Fetch one snapshot and return the trades that are new since the last poll.
    ///
    /// On fetch failure the state is left untouched. An unseeded wallet is
    /// seeded from this snapshot instead and reports nothing.
    pub async fn poll_wallet(&self, wallet: &str) -> Result<Vec<TradeRecord>, DataClientError> {
        let snapshot = self.source.fetch_trades(wallet).await?;

        let mut inner = self.inner.lock().await;
        if let Some(state) = inner.states.get_mut(wallet) {
            return Ok(state.ingest(&snapshot));
        }

        if inner.registry.is_tracked(wallet) {
            let state = WalletPollState::seed(&snapshot);
            tracing::info!(
                wallet = %wallet,
                high_water_mark = %state.high_water_mark(),
                "Seeded wallet poll state on scheduler tick"
            );
            inner.states.insert(wallet.to_string(), state);
        }
        Ok(Vec::new())
    }

    pub async fn state_of(&self, wallet: &str) -> Option<WalletPollState> {
        self.inner.lock().await.states.get(wallet).cloned()
    }

    pub async fn wallet_count(&self) -> usize {
        self.inner.lock().await.registry.wallet_count()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.registry.subscriber_count()
    }

    pub async fn refresh_gauges(&self) {
        self.inner.lock().await.publish_gauges();
    }

    async fn seed(&self, wallet: &str) {
        let snapshot = match self.source.fetch_trades(wallet).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    wallet = %wallet,
                    "Failed to seed wallet state, deferring to next poll tick"
                );
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if !inner.registry.is_tracked(wallet) || inner.states.contains_key(wallet) {
            // Untracked meanwhile, or a concurrent seed won.
            return;
        }

        let state = WalletPollState::seed(&snapshot);
        tracing::info!(
            wallet = %wallet,
            history = snapshot.len(),
            high_water_mark = %state.high_water_mark(),
            "Initialized wallet poll state"
        );
        inner.states.insert(wallet.to_string(), state);
    }
}

impl MonitorInner {
    fn publish_gauges(&self) {
        gauge!("tracked_wallets").set(self.registry.wallet_count() as f64);
        gauge!("subscribers").set(self.registry.subscriber_count() as f64);
    }
}
