use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, HttpConfig};
use crate::handlers::balance::balance_check;
use crate::handlers::events::{buy_event, buy_event_v2, create_event, get_event};
use crate::handlers::{balance_health, balance_root, inventory_health, inventory_metrics, inventory_root};
use crate::state::{BalanceState, InventoryState};

pub fn create_inventory_routes(state: InventoryState, http: &HttpConfig) -> Router {
    Router::new()
        .route("/", get(inventory_root))
        .route("/health", get(inventory_health))
        .route("/metrics", get(inventory_metrics))
        .route("/event", post(create_event))
        .route("/event/:id", get(get_event))
        .route("/event/:id/buy", post(buy_event))
        .route("/v2/event/:id/buy", post(buy_event_v2))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(http.production))
        .layer(create_cors_layer(&http.allowed_origins))
        .with_state(state)
}

pub fn create_balance_routes(state: BalanceState, http: &HttpConfig) -> Router {
    Router::new()
        .route("/", get(balance_root))
        .route("/health", get(balance_health))
        .route("/balance-check", post(balance_check))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(http.production))
        .layer(create_cors_layer(&http.allowed_origins))
        .with_state(state)
}
