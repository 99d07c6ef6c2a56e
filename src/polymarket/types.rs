use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Side, TradeRecord};

const UNKNOWN_MARKET: &str = "Unknown Market";

// ---------------------------------------------------------------------------
// Trade (Data API REST `/trades?user=`)
// ---------------------------------------------------------------------------

/// Raw row as returned by the Data API. Every field is optional; numbers may
/// arrive as JSON numbers or strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrade {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub proxy_wallet: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub size: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("missing or unparseable field `{0}`")]
    Missing(&'static str),

    #[error("unknown side `{0}`")]
    UnknownSide(String),
}

impl TryFrom<ApiTrade> for TradeRecord {
    type Error = IngestError;

    fn try_from(raw: ApiTrade) -> Result<Self, Self::Error> {
        let timestamp =
            parse_trade_timestamp(raw.timestamp.as_ref()).ok_or(IngestError::Missing("timestamp"))?;

        let transaction_hash = raw
            .transaction_hash
            .filter(|h| !h.trim().is_empty())
            .ok_or(IngestError::Missing("transactionHash"))?;

        let side_str = raw.side.as_deref().ok_or(IngestError::Missing("side"))?;
        let side =
            Side::from_api_str(side_str).ok_or_else(|| IngestError::UnknownSide(side_str.into()))?;

        let size = parse_decimal(raw.size.as_ref()).ok_or(IngestError::Missing("size"))?;
        let price = parse_decimal(raw.price.as_ref()).unwrap_or(Decimal::ZERO);

        Ok(TradeRecord {
            market: raw
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_MARKET.into()),
            market_slug: raw.slug,
            side,
            outcome: raw.outcome,
            size,
            price,
            timestamp,
            transaction_hash,
            condition_id: raw.condition_id.filter(|c| !c.is_empty()),
            record_id: raw.id.filter(|i| !i.is_empty()),
            asset: raw.asset,
        })
    }
}

fn parse_decimal(value: Option<&serde_json::Value>) -> Option<Decimal> {
    match value? {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_trade_timestamp(ts: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| match t {
        serde_json::Value::Number(n) => from_epoch(n.as_i64()?),
        serde_json::Value::String(s) => {
            if let Ok(secs) = s.trim().parse::<i64>() {
                return from_epoch(secs);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    })
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    // If >1e12, it's milliseconds
    if value > 1_000_000_000_000 {
        DateTime::from_timestamp(value / 1000, ((value % 1000) * 1_000_000) as u32)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}
