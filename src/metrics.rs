use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("wallet_polls_total").absolute(0);
    counter!("wallet_poll_failures_total").absolute(0);
    counter!("trades_detected_total").absolute(0);
    counter!("alerts_delivered_total").absolute(0);
    counter!("alert_delivery_failures_total").absolute(0);
    counter!("malformed_trades_total").absolute(0);

    gauge!("tracked_wallets").set(0.0);
    gauge!("subscribers").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("poll_tick_seconds").record(0.0);

    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally. Renders an
/// empty payload; used where the process-wide recorder must not be touched.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
