//! End-to-end tests over real sockets: both routers are served on random
//! local ports and driven with `reqwest`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use karcis_server::config::HttpConfig;
use karcis_server::models::{NewTicket, Ticket};
use karcis_server::routes::{create_balance_routes, create_inventory_routes};
use karcis_server::services::{BalanceClient, BalanceLedger, CheckoutService, ReservationEngine};
use karcis_server::state::{BalanceState, InventoryState};
use karcis_server::store::{InMemoryTicketStore, TicketStore};
use karcis_server::telemetry::Telemetry;
use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;

fn http_config() -> HttpConfig {
    HttpConfig {
        port: 0,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        production: false,
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_balance_service() -> String {
    let state = BalanceState {
        ledger: BalanceLedger::new(),
        telemetry: Telemetry::in_process("balance-service", 1.0),
    };
    let addr = spawn(create_balance_routes(state, &http_config())).await;
    format!("http://{}", addr)
}

struct Inventory {
    base: String,
    store: InMemoryTicketStore,
}

impl Inventory {
    async fn start(balance_base: String) -> Self {
        let store = InMemoryTicketStore::new();
        let engine = ReservationEngine::new(Arc::new(store.clone()), Duration::from_secs(5));
        engine.ensure_seeded(1, NewTicket::seed()).await.unwrap();

        let state = InventoryState {
            engine,
            checkout: CheckoutService::new(BalanceClient::new(balance_base, Duration::from_secs(2)).unwrap()),
            telemetry: Telemetry::in_process("inventory-service", 1.0),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
        };
        let addr = spawn(create_inventory_routes(state, &http_config())).await;

        Self {
            base: format!("http://{}", addr),
            store,
        }
    }

    async fn quota(&self, id: i64) -> i64 {
        self.store.find(id).await.unwrap().unwrap().quota
    }

    async fn create_event(&self, quota: i64) -> i64 {
        let resp = reqwest::Client::new()
            .post(format!("{}/event", self.base))
            .json(&serde_json::json!({ "title": "Jazz Night", "quota": quota, "price": 150000 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn sequential_buys_decrement_one_at_a_time() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let client = reqwest::Client::new();

    for expected in [999_999, 999_998, 999_997] {
        let resp = client
            .post(format!("{}/event/1/buy", inventory.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["remaining_quota"], expected);
        assert_eq!(inventory.quota(1).await, expected);
    }
}

#[tokio::test]
async fn sold_out_returns_conflict_and_keeps_zero() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let id = inventory.create_event(1).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{}/event/{}/buy", inventory.base, id)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.post(format!("{}/event/{}/buy", inventory.base, id)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "SOLD_OUT");
    assert_eq!(inventory.quota(id).await, 0);
}

#[tokio::test]
async fn concurrent_buyers_of_the_last_ticket() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let id = inventory.create_event(1).await;
    let client = reqwest::Client::new();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            let url = format!("{}/event/{}/buy", inventory.base, id);
            tokio::spawn(async move { client.post(url).send().await.unwrap().status() })
        })
        .collect();

    let mut ok = 0;
    let mut conflict = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => conflict += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(conflict, 9);
    assert_eq!(inventory.quota(id).await, 0);
    assert_eq!(inventory.quota(1).await, 1_000_000);
}

#[tokio::test]
async fn get_event_and_lookup_failures() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/event/1", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let ticket: Ticket = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(ticket.title, "Coldplay Jakarta");
    assert_eq!(ticket.quota, 1_000_000);
    assert_eq!(ticket.price, 800_000);

    let resp = client.get(format!("{}/event/42", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.get(format!("{}/event/abc", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client.post(format!("{}/event/42/buy", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(inventory.quota(1).await, 1_000_000);
}

#[tokio::test]
async fn created_events_can_be_bought() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/event", inventory.base))
        .json(&serde_json::json!({ "title": "Jazz Night", "description": "small venue", "quota": 2, "price": 150000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    for _ in 0..2 {
        let resp = client.post(format!("{}/event/{}/buy", inventory.base, id)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = client.post(format!("{}/event/{}/buy", inventory.base, id)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .post(format!("{}/event", inventory.base))
        .json(&serde_json::json!({ "title": "Broken", "quota": -1, "price": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/event", inventory.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn v2_buy_checks_balance_without_touching_quota() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{}/v2/event/1/buy", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "OK");

    // The balance-checked flow never reserves inventory.
    assert_eq!(inventory.quota(1).await, 1_000_000);
}

#[tokio::test]
async fn v2_buy_failures() {
    let inventory = Inventory::start(spawn_balance_service().await).await;
    let client = reqwest::Client::new();

    // User 2 is unknown to the balance service.
    let resp = client.post(format!("{}/v2/event/2/buy", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");

    let resp = client.post(format!("{}/v2/event/abc/buy", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // An explicit user id wins over the path segment.
    let resp = client
        .post(format!("{}/v2/event/7/buy?user_id=1", inventory.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(inventory.quota(1).await, 1_000_000);
}

#[tokio::test]
async fn v2_buy_with_balance_service_down() {
    // Bind and drop a listener to get a port nobody serves.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let inventory = Inventory::start(dead).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/v2/event/1/buy", inventory.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(inventory.quota(1).await, 1_000_000);
}

#[tokio::test]
async fn balance_service_contract() {
    let base = spawn_balance_service().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/balance-check", base))
        .json(&serde_json::json!({ "user_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "balance": 100000 }));

    let resp = client
        .post(format!("{}/balance-check", base))
        .json(&serde_json::json!({ "user_id": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{}/balance-check", base))
        .header("content-type", "application/json")
        .body(r#"{"user_id": "one"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn liveness_and_security_headers() {
    let balance = spawn_balance_service().await;
    let inventory = Inventory::start(balance.clone()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/", inventory.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.text().await.unwrap(), "Hello from inventory service");

    let resp = client.get(format!("{}/", balance)).send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "Hello from balance service");

    let resp = client.get(format!("{}/health", inventory.base)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["service"], "inventory-service");
}

#[tokio::test]
async fn metrics_endpoint_is_served() {
    let inventory = Inventory::start(spawn_balance_service().await).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/metrics", inventory.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}
