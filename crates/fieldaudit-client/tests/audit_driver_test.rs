//! Driver, seeder and prober behaviour against a wiremock stand-in for the
//! explorer API.
//!
//! | Behaviour | Test |
//! |-----------|------|
//! | Seeding prefers holder addresses | `seeding_harvests_list_endpoints_*` |
//! | Missing path seed skips without a request | `endpoint_without_seed_is_skipped_*` |
//! | Error bodies are still analysed | `non_2xx_body_is_classified` |
//! | Non-JSON bodies yield no observed fields | `non_json_body_*` |
//! | Timeouts are endpoint outcomes | `timeout_is_recorded_*` |
//! | Concurrency does not change the report | `reports_match_across_concurrency_levels` |

use std::sync::Arc;
use std::time::Duration;

use fieldaudit_client::seeds::seed;
use fieldaudit_client::{ApiClient, AuditConfig, AuditDriver, AuditReport, Seeds};
use fieldaudit_core::{FieldStatus, JsonType};
use fieldaudit_schema::ApiSpec;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, concurrency: usize) -> AuditConfig {
    let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let mut cfg = AuditConfig::new(base).with_concurrency(concurrency);
    cfg.timeout_secs = 5;
    cfg
}

fn spec(paths: Value) -> Arc<ApiSpec> {
    Arc::new(ApiSpec::from_value(json!({"openapi": "3.0.3", "paths": paths}), "inline.json").unwrap())
}

fn json_response(schema: Value) -> Value {
    json!({"200": {"content": {"application/json": {"schema": schema}}}})
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn endpoint<'a>(report: &'a AuditReport, template: &str) -> &'a fieldaudit_client::EndpointResult {
    report
        .endpoints
        .iter()
        .find(|e| e.path == template)
        .unwrap_or_else(|| panic!("no result for {template}"))
}

// ── Seeding ──────────────────────────────────────────────────────────

#[tokio::test]
async fn seeding_harvests_list_endpoints_and_prefers_holder_address() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/flow/v1/account",
        json!({"data": [{"address": "0x1111111111111111", "height": 5}]}),
    )
    .await;
    mount_json(&server, "/api/flow/v1/block", json!({"data": [{"height": 100}]})).await;
    mount_json(
        &server,
        "/api/flow/v1/ft",
        json!({"data": [{"id": "A.0000000000000001.Empty"}, {"id": "A.1654653399040a61.FlowToken"}]}),
    )
    .await;
    mount_json(
        &server,
        "/api/flow/v1/ft/A.0000000000000001.Empty/holding",
        json!({"data": []}),
    )
    .await;
    mount_json(
        &server,
        "/api/flow/v1/ft/A.1654653399040a61.FlowToken/holding",
        json!({"data": [{"address": "0x2222222222222222", "balance": 1.5}]}),
    )
    .await;
    mount_json(&server, "/api/flow/v1/evm/token", json!({"data": [{"id": "0xabc"}]})).await;

    let client = ApiClient::new(&config(&server, 1)).unwrap();
    let seeds = seed(&client).await;

    assert_eq!(
        seeds,
        Seeds {
            address: Some("0x2222222222222222".into()),
            height: Some("100".into()),
            token: Some("A.1654653399040a61.FlowToken".into()),
            evm_token_address: Some("0xabc".into()),
            ..Seeds::default()
        }
    );
}

#[tokio::test]
async fn seeding_reads_nft_holding_owner_and_item() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/flow/v1/nft", json!({"data": [{"id": "A.0b2a3299cc857e29.TopShot"}]})).await;
    mount_json(
        &server,
        "/api/flow/v1/nft/A.0b2a3299cc857e29.TopShot/holding",
        json!({"data": [{"owner": "0x3333333333333333", "nft_id": 42}]}),
    )
    .await;

    let client = ApiClient::new(&config(&server, 1)).unwrap();
    let seeds = seed(&client).await;
    assert_eq!(seeds.nft_type.as_deref(), Some("A.0b2a3299cc857e29.TopShot"));
    assert_eq!(seeds.address.as_deref(), Some("0x3333333333333333"));
    assert_eq!(seeds.nft_item_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn seeding_requests_one_item_with_offset_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flow/v1/transaction"))
        .and(query_param("limit", "1"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "ab12"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server, 1)).unwrap();
    assert_eq!(seed(&client).await.tx_id.as_deref(), Some("ab12"));
}

// ── Probing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn endpoint_without_seed_is_skipped_and_never_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/flow/v1/account/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let spec = spec(json!({
        "/flow/v1/account/{address}": {"get": {"responses": json_response(json!({"type": "object"}))}}
    }));
    let report = AuditDriver::new(config(&server, 2)).unwrap().run(spec).await;

    let ep = endpoint(&report, "/flow/v1/account/{address}");
    assert_eq!(ep.skip_reason.as_deref(), Some("missing path param address"));
    assert_eq!(ep.url, None);
    assert_eq!(ep.http_status, None);
    assert!(ep.field_results.is_empty());
}

#[tokio::test]
async fn non_2xx_body_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flow/v1/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom", "data": null})))
        .mount(&server)
        .await;

    let spec = spec(json!({
        "/flow/v1/broken": {"get": {"responses": json_response(json!({
            "type": "object",
            "required": ["data"],
            "properties": {"data": {"type": "array"}}
        }))}}
    }));
    let report = AuditDriver::new(config(&server, 1)).unwrap().run(spec).await;

    let ep = endpoint(&report, "/flow/v1/broken");
    assert_eq!(ep.http_status, Some(500));
    assert_eq!(ep.summary.http_status, Some(500));
    assert_eq!(ep.error, None);
    assert_eq!(ep.field_results.len(), 1);
    assert_eq!(ep.field_results[0].status, FieldStatus::Null);
    assert_eq!(ep.extra_fields.len(), 1);
    assert_eq!(ep.extra_fields[0].path, "error");
    assert_eq!(ep.extra_fields[0].observed_type, JsonType::String);
}

#[tokio::test]
async fn non_json_body_yields_missing_fields_and_no_extras() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flow/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let spec = spec(json!({
        "/flow/v1/status": {"get": {"responses": json_response(json!({
            "type": "object",
            "properties": {"height": {"type": "integer"}}
        }))}}
    }));
    let report = AuditDriver::new(config(&server, 1)).unwrap().run(spec).await;

    let ep = endpoint(&report, "/flow/v1/status");
    assert_eq!(ep.http_status, Some(200));
    assert_eq!(ep.summary.counts.missing, 1);
    assert!(ep.extra_fields.is_empty());
}

#[tokio::test]
async fn timeout_is_recorded_as_endpoint_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flow/v1/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_json(&server, "/api/flow/v1/fast", json!({"ok": true})).await;

    let spec = spec(json!({
        "/flow/v1/slow": {"get": {"responses": json_response(json!({"type": "object"}))}},
        "/flow/v1/fast": {"get": {"responses": json_response(json!({
            "type": "object", "properties": {"ok": {"type": "boolean"}}
        }))}}
    }));
    let mut cfg = config(&server, 2);
    cfg.timeout_secs = 1;
    let report = AuditDriver::new(cfg).unwrap().run(spec).await;

    let slow = endpoint(&report, "/flow/v1/slow");
    let error = slow.error.as_deref().unwrap();
    assert!(error.contains("timed out after 1s"), "{error}");
    assert_eq!(slow.http_status, None);
    assert!(slow.url.as_deref().unwrap().ends_with("/api/flow/v1/slow"));

    let fast = endpoint(&report, "/flow/v1/fast");
    assert_eq!(fast.summary.counts.ok, 1);
}

#[tokio::test]
async fn query_parameters_are_sent_in_declaration_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flow/v1/block"))
        .and(query_param("limit", "1"))
        .and(query_param("direction", "in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let spec = spec(json!({
        "/flow/v1/block": {"get": {
            "parameters": [
                {"name": "direction", "in": "query", "schema": {"type": "string"}},
                {"name": "limit", "in": "query", "schema": {"type": "integer"}},
                {"name": "cursor", "in": "query", "schema": {"type": "string"}}
            ],
            "responses": json_response(json!({
                "type": "object",
                "properties": {"data": {"type": "array", "items": {
                    "type": "object", "properties": {"height": {"type": "integer"}}
                }}}
            }))
        }}
    }));
    let report = AuditDriver::new(config(&server, 1)).unwrap().run(spec).await;

    let ep = endpoint(&report, "/flow/v1/block");
    assert!(ep.url.as_deref().unwrap().ends_with("/api/flow/v1/block?direction=in&limit=1"));
    let height = ep.field_results.iter().find(|f| f.field == "data[].height").unwrap();
    assert_eq!(height.status, FieldStatus::UnverifiedEmptyArray);
}

// ── Determinism ──────────────────────────────────────────────────────

fn normalized(mut report: AuditReport) -> AuditReport {
    report.timestamp = 0;
    for ep in &mut report.endpoints {
        ep.latency_ms = ep.latency_ms.map(|_| 0);
    }
    report
}

#[tokio::test]
async fn reports_match_across_concurrency_levels() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/flow/v1/account",
        json!({"data": [{"address": "0x1654653399040a61"}]}),
    )
    .await;
    mount_json(
        &server,
        "/api/flow/v1/account/0x1654653399040a61",
        json!({"data": {"address": "0x1654653399040a61", "balance": 10, "keys": []}}),
    )
    .await;
    for i in 0..12 {
        mount_json(
            &server,
            &format!("/api/flow/v1/item/{i}"),
            json!({"id": i, "name": format!("item-{i}"), "created_at": "2024-02-01T00:00:00Z", "_meta": {"v": 1}}),
        )
        .await;
    }

    let mut paths = serde_json::Map::new();
    paths.insert(
        "/flow/v1/account/{address}".into(),
        json!({"get": {"responses": json_response(json!({
            "type": "object",
            "properties": {"data": {"type": "object", "properties": {
                "address": {"type": "string"},
                "balance": {"type": "number"},
                "keys": {"type": "array", "items": {"type": "object", "properties": {"index": {"type": "integer"}}}}
            }}}
        }))}}),
    );
    paths.insert(
        "/flow/v1/evm/token/{address}".into(),
        json!({"get": {"responses": json_response(json!({"type": "object"}))}}),
    );
    for i in (0..12).rev() {
        paths.insert(
            format!("/flow/v1/item/{i}"),
            json!({"get": {"responses": json_response(json!({
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"},
                    "created_at": {"type": "string", "format": "date-time"},
                    "owner": {"type": "string"}
                }
            }))}}),
        );
    }
    let spec = spec(Value::Object(paths));

    let serial = AuditDriver::new(config(&server, 1)).unwrap().run(Arc::clone(&spec)).await;
    let parallel = AuditDriver::new(config(&server, 16)).unwrap().run(spec).await;

    assert_eq!(serial.endpoints.len(), 14);
    let sorted: Vec<&str> = serial.endpoints.iter().map(|e| e.path.as_str()).collect();
    let mut expected_order = sorted.clone();
    expected_order.sort();
    assert_eq!(sorted, expected_order);

    let serial = normalized(serial);
    let parallel = normalized(parallel);
    assert_eq!(serial, parallel);
    assert_eq!(
        serial.to_json_pretty().unwrap(),
        parallel.to_json_pretty().unwrap()
    );

    let account = endpoint(&serial, "/flow/v1/account/{address}");
    let keys_index = account
        .field_results
        .iter()
        .find(|f| f.field == "data.keys[].index")
        .unwrap();
    assert_eq!(keys_index.status, FieldStatus::UnverifiedEmptyArray);

    let evm = endpoint(&serial, "/flow/v1/evm/token/{address}");
    assert!(evm.is_skipped());

    let item = endpoint(&serial, "/flow/v1/item/3");
    assert_eq!(item.summary.counts.ok, 3);
    assert_eq!(item.summary.counts.missing, 1);
    assert!(item.extra_fields.is_empty(), "_meta is open by default");
}
