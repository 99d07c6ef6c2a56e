use std::env;
use std::time::Duration;

use anyhow::Context;

use crate::polymarket::data_client::DATA_API_BASE;

const MAX_POLL_CONCURRENCY: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Trade source
    pub data_api_url: String,
    pub trade_fetch_limit: u32,
    pub request_timeout: Duration,

    // Poll scheduler
    pub poll_interval: Duration,
    pub poll_concurrency: usize,
    pub shutdown_grace: Duration,

    // Delivery (alerts are only logged without a bot token)
    pub telegram_bot_token: Option<String>,

    // Control API auth (disabled when unset)
    pub api_token: Option<String>,

    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let poll_concurrency: usize = parse_var("POLL_CONCURRENCY", 8)?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 8080)?,

            data_api_url: env::var("DATA_API_URL").unwrap_or_else(|_| DATA_API_BASE.into()),
            trade_fetch_limit: parse_var("TRADE_FETCH_LIMIT", 50)?,
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 10)?),

            poll_interval: positive_millis("POLL_INTERVAL_MS", 1_000)?,
            poll_concurrency: poll_concurrency.clamp(1, MAX_POLL_CONCURRENCY),
            shutdown_grace: Duration::from_secs(parse_var("SHUTDOWN_GRACE_SECS", 5)?),

            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            api_token: non_empty_var("API_TOKEN"),

            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            data_api_url: DATA_API_BASE.into(),
            trade_fetch_limit: 50,
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(1_000),
            poll_concurrency: 8,
            shutdown_grace: Duration::from_secs(5),
            telegram_bot_token: None,
            api_token: None,
            log_json: false,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

/// A period that `tokio::time::interval` accepts: zero is a startup error.
fn positive_millis(name: &str, default: u64) -> anyhow::Result<Duration> {
    let ms: u64 = parse_var(name, default)?;
    anyhow::ensure!(ms > 0, "{name} must be greater than zero");
    Ok(Duration::from_millis(ms))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
