use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use polytrack::api::router::create_router;
use polytrack::api::ws_types::WsMessage;
use polytrack::config::AppConfig;
use polytrack::polymarket::DataClient;
use polytrack::services::dispatcher::{run_dispatcher, DetectedTrade, Dispatcher};
use polytrack::services::notifier::{AlertSink, LogNotifier, TelegramNotifier};
use polytrack::services::trade_poller::{run_trade_poller, PollerConfig};
use polytrack::tracking::WalletMonitor;
use polytrack::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);
    let metrics_handle = polytrack::metrics::init_metrics()?;
    let addr = format!("{}:{}", config.host, config.port);

    // --- Trade source + tracking state ---
    let data_client = DataClient::with_timeout(
        config.data_api_url.clone(),
        config.trade_fetch_limit,
        config.request_timeout,
    )?;
    let monitor = WalletMonitor::new(Arc::new(data_client));

    // --- Delivery ---
    let sink: Arc<dyn AlertSink> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token.clone(), config.request_timeout)?),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN is not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
    let (alert_tx, alert_rx) = mpsc::channel::<DetectedTrade>(1000);

    let dispatcher = Dispatcher::new(monitor.clone(), sink).with_broadcast(ws_tx.clone());
    tokio::spawn(run_dispatcher(alert_rx, dispatcher));

    // --- Poll scheduler ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_config = PollerConfig {
        interval: config.poll_interval,
        concurrency: config.poll_concurrency,
    };
    let poller = tokio::spawn(run_trade_poller(
        monitor.clone(),
        alert_tx,
        poller_config,
        shutdown_rx,
    ));

    // --- Control API ---
    let shutdown_grace = config.shutdown_grace;
    let state = AppState {
        config,
        monitor,
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if tokio::time::timeout(shutdown_grace, poller).await.is_err() {
        tracing::warn!(
            grace_secs = shutdown_grace.as_secs(),
            "Trade poller did not finish its tick in time, abandoning it"
        );
    }

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutting down gracefully...");
    let _ = shutdown_tx.send(true);
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
