use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::SubscriberId;
use crate::tracking::{normalize_address, TrackOutcome};
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct UntrackedWallet {
    pub wallet: String,
}

/// GET /api/subscribers/:id/wallets
pub async fn list(
    State(state): State<AppState>,
    Path(subscriber): Path<SubscriberId>,
) -> Json<ApiResponse<Vec<String>>> {
    ApiResponse::ok(state.monitor.list_tracked(subscriber).await)
}

/// POST /api/subscribers/:id/wallets: start tracking a wallet.
pub async fn track(
    State(state): State<AppState>,
    Path(subscriber): Path<SubscriberId>,
    Json(body): Json<TrackRequest>,
) -> Result<Json<ApiResponse<TrackOutcome>>, AppError> {
    let outcome = state.monitor.track(subscriber, &body.address).await?;
    Ok(ApiResponse::ok(outcome))
}

/// DELETE /api/subscribers/:id/wallets/:address: stop tracking a wallet.
pub async fn untrack(
    State(state): State<AppState>,
    Path((subscriber, address)): Path<(SubscriberId, String)>,
) -> Result<Json<ApiResponse<UntrackedWallet>>, AppError> {
    let wallet = normalize_address(&address)?;
    if !state.monitor.untrack(subscriber, &wallet).await? {
        return Err(AppError::NotFound(format!(
            "subscriber {subscriber} is not tracking {wallet}"
        )));
    }

    Ok(ApiResponse::ok(UntrackedWallet { wallet }))
}
