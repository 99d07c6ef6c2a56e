use axum::middleware;
use axum::routing::{delete, get};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes, no authentication
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::scrape));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        .route(
            "/api/subscribers/:id/wallets",
            get(handlers::tracking::list).post(handlers::tracking::track),
        )
        .route(
            "/api/subscribers/:id/wallets/:address",
            delete(handlers::tracking::untrack),
        )
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
