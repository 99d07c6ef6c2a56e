pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;
pub mod tracking;

use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::tracking::WalletMonitor;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub monitor: WalletMonitor,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
