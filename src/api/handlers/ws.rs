use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ws_types::WsMessage;
use crate::errors::AppError;
use crate::tracking::normalize_address;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedFilter {
    /// Only stream alerts for this wallet.
    pub wallet: Option<String>,
}

/// GET /ws[?wallet=0x...]: live `trade_alert` feed.
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(filter): Query<FeedFilter>,
) -> Result<Response, AppError> {
    let wallet = filter.wallet.as_deref().map(normalize_address).transpose()?;
    Ok(ws.on_upgrade(move |socket| forward_alerts(socket, state, wallet)))
}

fn wanted(msg: &WsMessage, wallet: Option<&str>) -> bool {
    match (msg, wallet) {
        (_, None) => true,
        (WsMessage::TradeAlert(alert), Some(w)) => alert.wallet == w,
    }
}

async fn forward_alerts(mut socket: WebSocket, state: AppState, wallet: Option<String>) {
    tracing::info!(wallet = ?wallet, "Alert feed client connected");
    let mut alerts = state.ws_tx.subscribe();

    loop {
        tokio::select! {
            alert = alerts.recv() => match alert {
                Ok(msg) if wanted(&msg, wallet.as_deref()) => {
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize trade alert");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Alert feed client lagged, alerts dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(wallet = ?wallet, "Alert feed client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ws_types::TradeAlertData;
    use crate::models::{Side, TradeRecord};
    use chrono::DateTime;
    use rust_decimal::Decimal;

    fn alert(wallet: &str) -> WsMessage {
        WsMessage::TradeAlert(TradeAlertData {
            wallet: wallet.into(),
            trade: TradeRecord {
                market: "m".into(),
                market_slug: None,
                side: Side::Sell,
                outcome: None,
                size: Decimal::from(1),
                price: Decimal::new(5, 1),
                timestamp: DateTime::from_timestamp(10, 0).unwrap(),
                transaction_hash: "0x1".into(),
                condition_id: None,
                record_id: None,
                asset: None,
            },
            notional: "0.5".into(),
            subscribers: 1,
        })
    }

    #[test]
    fn test_filter_matches_wallet() {
        let a = "0x742d35cc6634c0532925a3b8d4c9db96590c6c87";
        assert!(wanted(&alert(a), None));
        assert!(wanted(&alert(a), Some(a)));
        assert!(!wanted(&alert(a), Some("0x0000000000000000000000000000000000000001")));
    }
}
