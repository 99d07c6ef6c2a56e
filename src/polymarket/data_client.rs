use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use thiserror::Error;

use super::types::ApiTrade;
use crate::models::TradeRecord;
use crate::tracking::TradeSource;

pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
    trade_limit: u32,
}

impl DataClient {
    pub fn new(http: Client, base_url: impl Into<String>, trade_limit: u32) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            trade_limit,
        }
    }

    /// Build a client with its own connection pool and request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        trade_limit: u32,
        timeout: Duration,
    ) -> Result<Self, DataClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http, base_url, trade_limit))
    }

    /// Fetch the most recent trades of a wallet, newest first as the API returns them.
    pub async fn get_user_trades(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<Vec<ApiTrade>, DataClientError> {
        // Addresses are validated hex, so no query escaping is needed.
        let url = format!(
            "{}/trades?user={}&limit={}",
            self.base_url,
            wallet.to_lowercase(),
            limit
        );
        let resp = self.http.get(&url).send().await?.error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        if !body.is_array() {
            return Err(DataClientError::Unexpected(format!(
                "expected a JSON array of trades, got {}",
                kind_of(&body)
            )));
        }

        serde_json::from_value(body).map_err(|e| DataClientError::Unexpected(e.to_string()))
    }
}

#[async_trait]
impl TradeSource for DataClient {
    async fn fetch_trades(&self, wallet: &str) -> Result<Vec<TradeRecord>, DataClientError> {
        let rows = self.get_user_trades(wallet, self.trade_limit).await?;
        Ok(into_records(wallet, rows))
    }
}

/// Convert raw rows, dropping (and counting) the ones that fail validation.
pub fn into_records(wallet: &str, rows: Vec<ApiTrade>) -> Vec<TradeRecord> {
    rows.into_iter()
        .filter_map(|row| match TradeRecord::try_from(row) {
            Ok(trade) => Some(trade),
            Err(e) => {
                counter!("malformed_trades_total").increment(1);
                tracing::warn!(error = %e, wallet = %wallet, "Skipping malformed trade record");
                None
            }
        })
        .collect()
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
