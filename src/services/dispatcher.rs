use std::sync::Arc;

use futures_util::future::join_all;
use metrics::counter;
use tokio::sync::{broadcast, mpsc};

use crate::api::ws_types::{TradeAlertData, WsMessage};
use crate::models::TradeRecord;
use crate::services::notifier::AlertSink;
use crate::tracking::WalletMonitor;

/// A new trade found by the poller, queued for delivery.
#[derive(Debug, Clone)]
pub struct DetectedTrade {
    pub wallet: String,
    pub trade: TradeRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans a detected trade out to every current subscriber of its wallet.
#[derive(Clone)]
pub struct Dispatcher {
    monitor: WalletMonitor,
    sink: Arc<dyn AlertSink>,
    ws_tx: Option<broadcast::Sender<WsMessage>>,
}

impl Dispatcher {
    pub fn new(monitor: WalletMonitor, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            monitor,
            sink,
            ws_tx: None,
        }
    }

    /// Also publish every dispatched trade to dashboard WebSocket clients.
    pub fn with_broadcast(mut self, ws_tx: broadcast::Sender<WsMessage>) -> Self {
        self.ws_tx = Some(ws_tx);
        self
    }

    /// Subscribers are resolved now, not when the trade was detected, so a
    /// subscriber who untracked in between is skipped. Each delivery is
    /// independent; one failure never stops the others.
    pub async fn notify(&self, wallet: &str, trade: &TradeRecord) -> DispatchReport {
        let subscribers = self.monitor.list_subscribers(wallet).await;

        if let Some(tx) = &self.ws_tx {
            // Err only means no dashboard is connected.
            let _ = tx.send(WsMessage::TradeAlert(TradeAlertData {
                wallet: wallet.to_string(),
                trade: trade.clone(),
                notional: trade.notional().round_dp(2).to_string(),
                subscribers: subscribers.len(),
            }));
        }

        if subscribers.is_empty() {
            tracing::debug!(wallet = %wallet, "No subscribers left for detected trade");
            return DispatchReport::default();
        }

        let deliveries = subscribers.into_iter().map(|subscriber| async move {
            let result = self.sink.on_new_trade(wallet, trade, subscriber).await;
            (subscriber, result)
        });

        let mut report = DispatchReport::default();
        for (subscriber, result) in join_all(deliveries).await {
            match result {
                Ok(()) => {
                    counter!("alerts_delivered_total").increment(1);
                    report.delivered += 1;
                }
                Err(e) => {
                    counter!("alert_delivery_failures_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        subscriber,
                        wallet = %wallet,
                        "Failed to deliver trade alert"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Consume detected trades in arrival order. The poller enqueues a wallet's
/// trades oldest first, so alerts go out in the order the trades happened.
pub async fn run_dispatcher(mut rx: mpsc::Receiver<DetectedTrade>, dispatcher: Dispatcher) {
    tracing::info!("Trade alert dispatcher started");

    while let Some(detected) = rx.recv().await {
        let report = dispatcher.notify(&detected.wallet, &detected.trade).await;
        tracing::debug!(
            wallet = %detected.wallet,
            delivered = report.delivered,
            failed = report.failed,
            "Trade alert dispatched"
        );
    }

    tracing::info!("Detected trade channel closed, dispatcher stopping");
}
