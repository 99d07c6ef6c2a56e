use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;

use polytrack::models::{Side, SubscriberId, TradeRecord};
use polytrack::polymarket::DataClientError;
use polytrack::services::notifier::{AlertSink, DeliveryError};
use polytrack::tracking::TradeSource;

#[allow(dead_code)]
pub const WALLET_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
#[allow(dead_code)]
pub const WALLET_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Trade source whose per-wallet snapshot can be replaced between polls.
/// `None` makes the next fetch fail.
#[derive(Default)]
pub struct FakeTradeSource {
    snapshots: Mutex<HashMap<String, Option<Vec<TradeRecord>>>>,
    fetches: Mutex<usize>,
}

#[allow(dead_code)]
impl FakeTradeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, wallet: &str, trades: Vec<TradeRecord>) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(wallet.to_lowercase(), Some(trades));
    }

    pub fn fail(&self, wallet: &str) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(wallet.to_lowercase(), None);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl TradeSource for FakeTradeSource {
    async fn fetch_trades(&self, wallet: &str) -> Result<Vec<TradeRecord>, DataClientError> {
        *self.fetches.lock().unwrap() += 1;
        match self.snapshots.lock().unwrap().get(wallet) {
            Some(Some(trades)) => Ok(trades.clone()),
            Some(None) => Err(DataClientError::Unexpected("connection reset".into())),
            None => Ok(Vec::new()),
        }
    }
}

/// Records every delivery; subscribers listed in `failing` get an error.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    pub failing: Mutex<Vec<SubscriberId>>,
    deliveries: Mutex<Vec<(SubscriberId, String, String)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, subscriber: SubscriberId) {
        self.failing.lock().unwrap().push(subscriber);
    }

    /// (subscriber, wallet, transaction hash) in delivery order.
    pub fn deliveries(&self) -> Vec<(SubscriberId, String, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivered_to(&self, subscriber: SubscriberId) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .filter(|(s, _, _)| *s == subscriber)
            .map(|(_, _, tx)| tx)
            .collect()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn on_new_trade(
        &self,
        wallet: &str,
        trade: &TradeRecord,
        subscriber: SubscriberId,
    ) -> Result<(), DeliveryError> {
        if self.failing.lock().unwrap().contains(&subscriber) {
            return Err(DeliveryError::Rejected {
                status: 400,
                body: "chat not found".into(),
            });
        }
        self.deliveries.lock().unwrap().push((
            subscriber,
            wallet.to_string(),
            trade.transaction_hash.clone(),
        ));
        Ok(())
    }
}

/// A fill with a unique transaction hash at unix second `ts`.
#[allow(dead_code)]
pub fn trade(tx: &str, ts: i64) -> TradeRecord {
    TradeRecord {
        market: "Will the Fed cut rates in March?".into(),
        market_slug: Some("fed-march-cut".into()),
        side: Side::Buy,
        outcome: Some("Yes".into()),
        size: Decimal::from(250),
        price: Decimal::new(37, 2),
        timestamp: DateTime::from_timestamp(ts, 0).expect("valid timestamp"),
        transaction_hash: tx.into(),
        condition_id: Some("0xc0nd".into()),
        record_id: None,
        asset: Some("1234".into()),
    }
}
