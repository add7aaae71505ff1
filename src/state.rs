use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::services::{BalanceLedger, CheckoutService, ReservationEngine};
use crate::telemetry::Telemetry;

#[derive(Clone)]
pub struct InventoryState {
    pub engine: ReservationEngine,
    pub checkout: CheckoutService,
    pub telemetry: Telemetry,
    pub metrics: PrometheusHandle,
}

impl FromRef<InventoryState> for Telemetry {
    fn from_ref(state: &InventoryState) -> Self {
        state.telemetry.clone()
    }
}

#[derive(Clone)]
pub struct BalanceState {
    pub ledger: BalanceLedger,
    pub telemetry: Telemetry,
}

impl FromRef<BalanceState> for Telemetry {
    fn from_ref(state: &BalanceState) -> Self {
        state.telemetry.clone()
    }
}
