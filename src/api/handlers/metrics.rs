use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::metrics::PROMETHEUS_TEXT;
use crate::AppState;

/// GET /metrics: registry gauges are refreshed before each scrape.
pub async fn scrape(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.refresh_gauges().await;
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], state.metrics_handle.render())
}
