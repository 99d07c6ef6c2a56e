use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "tracked_wallets": state.monitor.wallet_count().await,
        "subscribers": state.monitor.subscriber_count().await,
    }))
}
