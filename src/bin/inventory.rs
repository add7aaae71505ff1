use std::sync::Arc;

use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;

use karcis_server::config::InventoryConfig;
use karcis_server::handlers::INVENTORY_SERVICE;
use karcis_server::lifecycle::serve;
use karcis_server::models::NewTicket;
use karcis_server::routes::create_inventory_routes;
use karcis_server::services::{BalanceClient, CheckoutService, ReservationEngine};
use karcis_server::state::InventoryState;
use karcis_server::store::{InMemoryTicketStore, PgTicketStore, TicketStore};
use karcis_server::telemetry::init_tracing;

const SEED_EVENT_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = InventoryConfig::from_env()?;
    let telemetry = init_tracing(INVENTORY_SERVICE, &config.observability)?;
    let metrics = PrometheusBuilder::new().install_recorder()?;

    let store: Arc<dyn TicketStore> = if config.database_url.starts_with("memory:") {
        tracing::warn!("Using in-memory ticket store, nothing will be persisted");
        Arc::new(InMemoryTicketStore::new())
    } else {
        let store = PgTicketStore::connect(&config.database_url, config.db_max_connections).await?;
        tracing::info!("Successfully connected to database");

        store.migrate().await?;
        tracing::info!("Migrations run successfully");
        Arc::new(store)
    };

    let engine = ReservationEngine::new(store, config.request_timeout);
    let seed = engine.ensure_seeded(SEED_EVENT_ID, NewTicket::seed()).await?;
    tracing::info!(id = seed.id, quota = seed.quota, "Seed event ready");

    let balances = BalanceClient::new(config.balance_base_url.clone(), config.request_timeout)?;
    let state = InventoryState {
        engine,
        checkout: CheckoutService::new(balances),
        telemetry: telemetry.clone(),
        metrics,
    };

    let app = create_inventory_routes(state, &config.http);
    serve(app, config.http.port, telemetry).await?;

    Ok(())
}
