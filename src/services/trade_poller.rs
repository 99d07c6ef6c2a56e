use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::services::dispatcher::DetectedTrade;
use crate::tracking::WalletMonitor;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Upper bound on wallets polled at once within a tick.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub wallets: usize,
    pub failed: usize,
    pub new_trades: usize,
}

/// Poll every tracked wallet once per interval until `shutdown` flips to true.
///
/// Flow per tick:
/// 1. Take the current set of tracked wallets
/// 2. Fetch each wallet's snapshot (bounded concurrency) and dedup it
/// 3. Queue new trades, oldest first, for the dispatcher
///
/// A failing wallet is logged and skipped; the loop itself never exits on error.
/// An in-flight tick is always finished before shutdown is honoured.
pub async fn run_trade_poller(
    monitor: WalletMonitor,
    alert_tx: mpsc::Sender<DetectedTrade>,
    config: PollerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_ms = config.interval.as_millis() as u64,
        concurrency = config.concurrency,
        "Trade poller started"
    );

    // `interval` panics on a zero period.
    let mut ticker = interval(config.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let summary = poll_tick(&monitor, &alert_tx, config.concurrency).await;

        if summary.new_trades > 0 {
            tracing::info!(
                wallets = summary.wallets,
                failed = summary.failed,
                new_trades = summary.new_trades,
                "Trade poller cycle: found {} new trades",
                summary.new_trades
            );
        } else {
            tracing::debug!(
                wallets = summary.wallets,
                failed = summary.failed,
                "Trade poller cycle: no new trades"
            );
        }

        if *shutdown.borrow() {
            break;
        }
    }

    tracing::info!("Trade poller stopped");
}

/// Run one tick over the current poll universe.
pub async fn poll_tick(
    monitor: &WalletMonitor,
    alert_tx: &mpsc::Sender<DetectedTrade>,
    concurrency: usize,
) -> TickSummary {
    let started = Instant::now();
    let wallets = monitor.poll_universe().await;
    let mut summary = TickSummary {
        wallets: wallets.len(),
        ..Default::default()
    };

    if wallets.is_empty() {
        return summary;
    }

    let results: Vec<_> = stream::iter(wallets)
        .map(|wallet| async move {
            let result = monitor.poll_wallet(&wallet).await;
            (wallet, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (wallet, result) in results {
        counter!("wallet_polls_total").increment(1);

        let trades = match result {
            Ok(t) => t,
            Err(e) => {
                counter!("wallet_poll_failures_total").increment(1);
                tracing::warn!(
                    error = %e,
                    wallet = %wallet,
                    "Trade poller: failed to fetch trades"
                );
                summary.failed += 1;
                continue;
            }
        };

        for trade in trades {
            tracing::info!(
                wallet = %wallet,
                market = %trade.market,
                side = %trade.side,
                size = %trade.size,
                price = %trade.price,
                "New trade detected"
            );
            counter!("trades_detected_total").increment(1);
            summary.new_trades += 1;

            let detected = DetectedTrade {
                wallet: wallet.clone(),
                trade,
            };
            if let Err(e) = alert_tx.send(detected).await {
                tracing::error!(error = %e, "Failed to queue detected trade for dispatch");
            }
        }
    }

    histogram!("poll_tick_seconds").record(started.elapsed().as_secs_f64());
    summary
}
