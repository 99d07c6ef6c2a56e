use serde::Serialize;

use crate::models::TradeRecord;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "trade_alert")]
    TradeAlert(TradeAlertData),
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeAlertData {
    pub wallet: String,
    pub trade: TradeRecord,
    pub notional: String,
    pub subscribers: usize,
}
