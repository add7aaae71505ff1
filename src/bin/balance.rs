use dotenvy::dotenv;

use karcis_server::config::BalanceConfig;
use karcis_server::handlers::BALANCE_SERVICE;
use karcis_server::lifecycle::serve;
use karcis_server::routes::create_balance_routes;
use karcis_server::services::BalanceLedger;
use karcis_server::state::BalanceState;
use karcis_server::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = BalanceConfig::from_env()?;
    let telemetry = init_tracing(BALANCE_SERVICE, &config.observability)?;

    let state = BalanceState {
        ledger: BalanceLedger::new(),
        telemetry: telemetry.clone(),
    };

    let app = create_balance_routes(state, &config.http);
    serve(app, config.http.port, telemetry).await?;

    Ok(())
}
