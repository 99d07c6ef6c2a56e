use async_trait::async_trait;

use crate::models::TradeRecord;
use crate::polymarket::DataClientError;

/// Snapshot provider for a wallet's recent trades.
///
/// Results are unordered and may overlap previous snapshots. An `Err` means
/// "no update this tick", never "the wallet has no trades".
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn fetch_trades(&self, wallet: &str) -> Result<Vec<TradeRecord>, DataClientError>;
}
