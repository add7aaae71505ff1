use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::state::InventoryState;
use crate::utils::response::success;

pub mod balance;
pub mod events;

pub const INVENTORY_SERVICE: &str = "inventory-service";
pub const BALANCE_SERVICE: &str = "balance-service";

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

fn health(service: &'static str) -> Response {
    let payload = HealthPayload { status: "ok", service };

    success(payload, "Health check successful").into_response()
}

pub async fn inventory_health() -> Response {
    health(INVENTORY_SERVICE)
}

pub async fn balance_health() -> Response {
    health(BALANCE_SERVICE)
}

pub async fn inventory_root() -> &'static str {
    "Hello from inventory service"
}

pub async fn balance_root() -> &'static str {
    "Hello from balance service"
}

/// Prometheus text exposition of the inventory service's counters.
pub async fn inventory_metrics(State(state): State<InventoryState>) -> String {
    state.metrics.render()
}
