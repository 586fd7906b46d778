//! Bybit instruments-info client tests against a local mock server.

mod common;

use std::time::Duration;

use rust_decimal_macros::dec;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

use gridhedge::GridError;
use gridhedge::bybit::BybitClient;
use gridhedge::config::BybitConfig;
use gridhedge::models::Credentials;
use gridhedge::specs::{SpecRegistry, SpecSource};

use common::fixture;

const INSTRUMENTS_PATH: &str = "/v5/market/instruments-info";

fn body(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).expect("Failed to read fixture")
}

fn client(server: &MockServer) -> BybitClient {
    BybitClient::new(&BybitConfig {
        rest_url: server.uri(),
        recv_window_ms: 5_000,
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to build client")
}

async fn mount_two_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(INSTRUMENTS_PATH))
        .and(query_param("cursor", "page2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body("instruments_page2.json"), "application/json"),
        )
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(INSTRUMENTS_PATH))
        .and(query_param("category", "linear"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body("instruments_page1.json"), "application/json"),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn follows_cursor_and_keeps_usdt_perpetuals() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let specs = client(&server).fetch_specs(None).await.unwrap();

    let symbols: Vec<&str> = specs.keys().map(String::as_str).collect();
    assert_eq!(symbols, ["1000PEPEUSDT", "BTCUSDT", "ETHUSDT"]);
    assert_eq!(specs["BTCUSDT"].tick_size, dec!(0.10));
    assert_eq!(specs["BTCUSDT"].qty_step, dec!(0.001));
    assert_eq!(specs["1000PEPEUSDT"].tick_size, dec!(0.0000001));
    assert_eq!(specs["1000PEPEUSDT"].qty_step, dec!(100));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn exchange_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INSTRUMENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body("rate_limited.json"), "application/json"),
        )
        .mount(&server)
        .await;

    let err = client(&server).fetch_specs(None).await.unwrap_err();
    match err {
        GridError::Exchange { code, message } => {
            assert_eq!(code, 10006);
            assert_eq!(message, "Too many visits!");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn http_failure_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INSTRUMENTS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).fetch_specs(None).await.unwrap_err();
    assert!(matches!(err, GridError::Http(_)));
}

#[tokio::test]
async fn unsigned_without_credentials() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    client(&server).fetch_specs(None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| !r.headers.contains_key("X-BAPI-SIGN"))
    );
}

#[tokio::test]
async fn signed_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INSTRUMENTS_PATH))
        .and(header_exists("X-BAPI-SIGN"))
        .and(header_exists("X-BAPI-TIMESTAMP"))
        .and(header_exists("X-BAPI-RECV-WINDOW"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body("instruments_page2.json"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials {
        api_key: "api-key".into(),
        api_secret: Zeroizing::new("api-secret".into()),
    };
    let specs = client(&server).fetch_specs(Some(&credentials)).await.unwrap();
    assert_eq!(specs.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].headers["X-BAPI-API-KEY"], "api-key");
}

#[tokio::test]
async fn registry_refresh_from_exchange() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let registry = SpecRegistry::new();
    let count = registry.refresh(&client(&server), None).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(registry.get("ethusdt").unwrap().qty_step, dec!(0.01));
    assert!(registry.get("BTCPERP").is_none());
    assert!(registry.get("BROKENUSDT").is_none());
}
