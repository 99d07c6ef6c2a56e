use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;

/// One executed fill reported by the venue, validated at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub market: String,
    pub market_slug: Option<String>,
    pub side: Side,
    pub outcome: Option<String>,
    pub size: Decimal,
    pub price: Decimal,
    /// Second precision; distinct fills may share a timestamp.
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub condition_id: Option<String>,
    /// Provider-side record id, used when no condition id is present.
    pub record_id: Option<String>,
    pub asset: Option<String>,
}

impl TradeRecord {
    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }

    /// Composite identity used for deduplication. The timestamp is deliberately
    /// not part of it.
    pub fn signature(&self) -> TradeSignature {
        let record = self
            .condition_id
            .as_deref()
            .or(self.record_id.as_deref())
            .unwrap_or("");
        TradeSignature(format!(
            "{}-{}-{}-{}",
            self.transaction_hash,
            record,
            self.side,
            self.size.normalize()
        ))
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: market={} side={} size={} price={} tx={}",
            self.market,
            self.side,
            self.size,
            self.price,
            self.transaction_hash.chars().take(10).collect::<String>(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeSignature(String);

impl TradeSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
