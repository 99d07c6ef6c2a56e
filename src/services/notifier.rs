use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::models::{SubscriberId, TradeRecord};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const TX_EXPLORER: &str = "https://polygonscan.com/tx";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivery callback registered once at startup, invoked once per
/// (record, subscriber) pair.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn on_new_trade(
        &self,
        wallet: &str,
        trade: &TradeRecord,
        subscriber: SubscriberId,
    ) -> Result<(), DeliveryError>;
}

/// Telegram delivery: one `sendMessage` per subscriber chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, bot_token })
    }

    pub async fn send(&self, chat_id: SubscriberId, message: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.bot_token);

        let body = json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    async fn on_new_trade(
        &self,
        wallet: &str,
        trade: &TradeRecord,
        subscriber: SubscriberId,
    ) -> Result<(), DeliveryError> {
        self.send(subscriber, &format_trade_alert(wallet, trade)).await
    }
}

/// Used when no bot token is configured: alerts only go to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertSink for LogNotifier {
    async fn on_new_trade(
        &self,
        wallet: &str,
        trade: &TradeRecord,
        subscriber: SubscriberId,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            subscriber,
            wallet = %wallet,
            side = %trade.side,
            market = %trade.market,
            size = %trade.size,
            price = %trade.price,
            tx = %trade.transaction_hash,
            "Trade alert (no Telegram token configured)"
        );
        Ok(())
    }
}

/// `0x1234...abcd`
pub fn short_wallet(wallet: &str) -> String {
    if wallet.len() > 10 {
        format!("{}...{}", &wallet[..6], &wallet[wallet.len() - 4..])
    } else {
        wallet.to_string()
    }
}

/// Format a new-trade alert for a tracked wallet.
pub fn format_trade_alert(wallet: &str, trade: &TradeRecord) -> String {
    let outcome = trade.outcome.as_deref().unwrap_or("-");

    format!(
        "*New Transaction Detected*\nWallet: `{}`\nSide: {}\nMarket: {}\nOutcome: {}\nSize: {}\nPrice: ${}\nValue: ${}\nTime: {}\n[View Transaction]({}/{})",
        short_wallet(wallet),
        trade.side,
        escape_markdown(&trade.market),
        escape_markdown(outcome),
        trade.size.round_dp(2),
        trade.price.round_dp(2),
        trade.notional().round_dp(2),
        trade.timestamp.format("%b %-d, %Y %H:%M:%S UTC"),
        TX_EXPLORER,
        trade.transaction_hash,
    )
}

/// Backslash-escape the control characters of Telegram's legacy Markdown.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
