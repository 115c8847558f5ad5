//! Tests for the extraction engine

use super::*;
use crate::client::PollConfig;
use crate::http::{HttpClient, HttpClientConfig};
use crate::output::TableManifest;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn extractor_for(server: &MockServer, config: Value, tables_dir: &Path) -> Extractor {
    let http = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .max_retries(0)
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    let client = CustomerIoClient::new(http)
        .with_poll_config(PollConfig::new(Duration::from_millis(5), 20));

    let config = ExtractorConfig::from_value(config).unwrap();
    Extractor::new(client, config, tables_dir)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn fields(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

async fn mount_activity_pages(server: &MockServer, activity_type: &str, pages: Vec<Value>) {
    let last = pages.len().saturating_sub(1);
    for (index, records) in pages.into_iter().enumerate() {
        let mut body = json!({ "activities": records });
        if index < last {
            body["next"] = json!(format!("{activity_type}-c{}", index + 1));
        }

        let mut mock = Mock::given(method("GET"))
            .and(path("/activities"))
            .and(query_param("type", activity_type));
        mock = if index == 0 {
            mock.and(query_param_is_missing("start"))
        } else {
            mock.and(query_param("start", format!("{activity_type}-c{index}").as_str()))
        };

        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

// ============================================================================
// RunStats / RunContext Tests
// ============================================================================

#[test]
fn test_run_stats_counters() {
    let mut stats = RunStats::default();
    stats.add_page();
    stats.add_page();
    stats.add_records(5);
    stats.add_table();
    stats.set_duration(42);

    assert_eq!(
        stats,
        RunStats {
            records_written: 5,
            pages_fetched: 2,
            tables_written: 1,
            duration_ms: 42,
        }
    );
}

#[test]
fn test_header_scope_table_names() {
    assert_eq!(HeaderScope::Activity.table_name("page"), "activity_page");
    assert_eq!(
        HeaderScope::Activity.table_name("secondary:opened_email"),
        "activity_secondary_opened_email"
    );
    assert_eq!(HeaderScope::Message.table_name("email"), "message_email");
    assert_eq!(HeaderScope::Message.resource().primary_key(), &["deduplicate_id"]);
}

#[test]
fn test_sink_skips_empty_batches() {
    let dir = tempdir().unwrap();
    let mut state = ExtractorState::new();
    let mut sink = RecordSink::per_type(dir.path(), HeaderScope::Activity, false);

    sink.accept("page", &[], &mut state).unwrap();

    assert!(state.is_empty());
    assert!(sink.finish_kind("page").unwrap().is_none());
    assert!(sink.finalize().unwrap().is_empty());
}

#[test]
fn test_sink_header_is_prior_plus_first_page() {
    let dir = tempdir().unwrap();
    let mut state = ExtractorState::new();
    state.extend_activity_header("event", ["legacy".to_string()]);

    let mut sink = RecordSink::per_type(dir.path(), HeaderScope::Activity, false);
    sink.accept(
        "event",
        &[json!({"id": "e1", "name": "signup"}), json!({"id": "e2", "data": {"plan": "pro"}})],
        &mut state,
    )
    .unwrap();
    sink.accept("event", &[json!({"id": "e3", "late": true})], &mut state)
        .unwrap();

    let table = sink.finish_kind("event").unwrap().unwrap();
    assert_eq!(table.name, "activity_event");
    assert_eq!(table.columns, vec!["id", "data_plan", "legacy", "name"]);
    assert_eq!(table.rows_written, Some(3));
    assert_eq!(read(&table.path), "e1,,,signup\ne2,pro,,\ne3,,,\n");
    assert_eq!(
        state.activity_header("event").unwrap(),
        &fields(&["data_plan", "id", "legacy", "name"])
    );
}

// ============================================================================
// Activities Tests
// ============================================================================

#[tokio::test]
async fn test_parsed_data_header_frozen_at_first_page() {
    let server = MockServer::start().await;
    mount_activity_pages(
        &server,
        "page",
        vec![
            json!([{"id": "a1", "type": "page", "timestamp": 100}]),
            json!([{"id": "a2", "type": "page", "timestamp": 200, "extra": "x"}]),
        ],
    )
    .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": [{"types": ["page"], "mode": "PARSED_DATA"}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    assert_eq!(
        outcome.state.activity_header("page").unwrap(),
        &fields(&["id", "timestamp", "type"])
    );

    let table = outcome.table("activity_page").unwrap();
    assert_eq!(table.columns, vec!["id", "timestamp", "type"]);
    assert_eq!(read(&table.path), "a1,100,page\na2,200,page\n");

    let manifest = TableManifest::read_from(&table.manifest_path).unwrap();
    assert_eq!(manifest.primary_key, vec!["id"]);
    assert_eq!(
        manifest.columns,
        Some(vec!["id".into(), "timestamp".into(), "type".into()])
    );

    assert_eq!(outcome.stats.pages_fetched, 2);
    assert_eq!(outcome.stats.records_written, 2);
    assert_eq!(outcome.stats.tables_written, 1);
}

#[tokio::test]
async fn test_parsed_data_header_grows_across_runs() {
    let server = MockServer::start().await;
    mount_activity_pages(
        &server,
        "page",
        vec![json!([{"id": "a3", "type": "page", "timestamp": 300, "extra": "y"}])],
    )
    .await;

    let mut prior = ExtractorState::new();
    prior.extend_activity_header(
        "page",
        ["id".to_string(), "timestamp".to_string(), "type".to_string()],
    );

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": [{"types": ["page"], "mode": "PARSED_DATA"}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(prior).await.unwrap();

    assert_eq!(
        outcome.state.activity_header("page").unwrap(),
        &fields(&["extra", "id", "timestamp", "type"])
    );
    let table = outcome.table("activity_page").unwrap();
    assert_eq!(table.columns, vec!["id", "extra", "timestamp", "type"]);
    assert_eq!(read(&table.path), "a3,y,300,page\n");
}

#[tokio::test]
async fn test_parsed_data_skips_empty_pages_and_types() {
    let server = MockServer::start().await;
    mount_activity_pages(
        &server,
        "page",
        vec![json!([]), json!([{"id": "a1", "data": {"url": "/x"}}])],
    )
    .await;
    mount_activity_pages(&server, "event", vec![json!([])]).await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": {"types": ["page", "event"], "mode": "PARSED_DATA"}
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    assert_eq!(outcome.tables.len(), 1);
    let table = outcome.table("activity_page").unwrap();
    assert_eq!(table.columns, vec!["id", "data_url"]);
    assert_eq!(read(&table.path), "a1,/x\n");
    assert!(outcome.state.activity_header("event").is_none());
    assert!(!dir.path().join("activity_event.csv").exists());
}

#[tokio::test]
async fn test_repeated_types_extract_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("type", "page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"id": "a1", "type": "page"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("type", "email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "m1", "deduplicate_id": "d1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": [{"types": ["page", "page"], "mode": "PARSED_DATA"}],
            "messages": [{"types": ["email", "email"]}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    let names: Vec<&str> = outcome.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["activity_page", "message_email"]);
    assert_eq!(read(&outcome.table("activity_page").unwrap().path), "a1,page\n");
    assert_eq!(outcome.table("message_email").unwrap().rows_written, Some(1));
    assert_eq!(outcome.stats.records_written, 2);
}

#[tokio::test]
async fn test_single_table_collapses_types() {
    let server = MockServer::start().await;
    mount_activity_pages(
        &server,
        "page",
        vec![json!([{"id": "a1", "type": "page", "timestamp": 1, "data": {"url": "/x"}}])],
    )
    .await;
    mount_activity_pages(
        &server,
        "event",
        vec![json!([{"id": "e1", "customer_id": "c1", "type": "event", "timestamp": 2}])],
    )
    .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "incremental_output": true,
            "activities": [{"types": ["page", "event"], "mode": "SINGLE_TABLE"}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    assert_eq!(outcome.tables.len(), 1);
    let table = outcome.table(SINGLE_ACTIVITY_TABLE).unwrap();
    assert_eq!(table.columns, crate::client::SINGLE_ACTIVITY_COLUMNS.to_vec());
    assert!(table.incremental);
    assert_eq!(
        read(&table.path),
        "a1,,page,1,\"{\"\"url\"\":\"\"/x\"\"}\",,\ne1,c1,event,2,,,\n"
    );
    assert!(outcome.state.activity_headers.is_empty());
}

#[tokio::test]
async fn test_activities_deleted_flag_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("type", "event"))
        .and(query_param("deleted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"activities": []})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": [{"types": ["event"], "mode": "PARSED_DATA", "deleted": true}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();
    assert!(outcome.tables.is_empty());
}

// ============================================================================
// Messages Tests
// ============================================================================

#[tokio::test]
async fn test_messages_capture_latest_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("type", "email"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"deduplicate_id": "d1", "metrics": {"sent": 1}}],
            "next": "tok-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("start", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"deduplicate_id": "d2", "subject": "late"}],
            "next": ""
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "messages": [{"types": ["email"], "incremental": true}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    assert_eq!(outcome.state.message_token("email"), Some("tok-1"));
    assert_eq!(outcome.state.message_headers, fields(&["deduplicate_id", "metrics_sent"]));

    let table = outcome.table("message_email").unwrap();
    assert_eq!(table.primary_key, vec!["deduplicate_id"]);
    assert_eq!(table.columns, vec!["deduplicate_id", "metrics_sent"]);
    assert_eq!(read(&table.path), "d1,1\nd2,\n");
}

#[tokio::test]
async fn test_messages_resume_from_saved_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("type", "email"))
        .and(query_param("start", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"deduplicate_id": "d3"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut prior = ExtractorState::new();
    prior.set_message_token("email", "tok-1");
    prior.extend_message_header(["deduplicate_id".to_string(), "subject".to_string()]);

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "messages": [{"types": ["email"], "incremental": true}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(prior).await.unwrap();

    assert_eq!(outcome.state.message_token("email"), Some("tok-1"));
    let table = outcome.table("message_email").unwrap();
    assert_eq!(table.columns, vec!["deduplicate_id", "subject"]);
    assert_eq!(read(&table.path), "d3,\n");
}

#[tokio::test]
async fn test_messages_ignore_token_when_not_incremental() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut prior = ExtractorState::new();
    prior.set_message_token("email", "tok-9");

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "messages": [{"types": ["email"]}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(prior).await.unwrap();
    assert_eq!(outcome.state.message_token("email"), Some("tok-9"));
}

// ============================================================================
// Campaigns / Segments / Customers Tests
// ============================================================================

#[tokio::test]
async fn test_campaigns_use_fixed_columns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaigns": [{"id": 7, "name": "Welcome", "tags": ["a"], "surprise": 1}]
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({"site_id": "s", "#api_secret": "k", "campaigns": true}),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    let table = outcome.table("campaigns").unwrap();
    assert_eq!(table.columns, CAMPAIGN_COLUMNS.to_vec());
    assert_eq!(
        read(&table.path),
        "7,,Welcome,,,,,,,,,\"[\"\"a\"\"]\",,,,,,,\n"
    );
}

#[tokio::test]
async fn test_segments_discover_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/segments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segments": [
                {"id": 1, "name": "VIP"},
                {"id": 2, "name": "Churned", "description": "gone"}
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({"site_id": "s", "#api_secret": "k", "segments": true}),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    let table = outcome.table("segments").unwrap();
    assert_eq!(table.columns, vec!["id", "description", "name"]);
    assert_eq!(read(&table.path), "1,,VIP\n2,gone,Churned\n");
}

#[tokio::test]
async fn test_customers_export_writes_file_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exports/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"export": {"id": 12}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/exports/12/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"url": format!("{}/files/export.csv", server.uri())})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id,email\n1,a@b.c\n"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "incremental_output": true,
            "customers": [{"filters": "{\"segment\": {\"id\": 3}}"}]
        }),
        dir.path(),
    );

    let outcome = extractor.run(ExtractorState::new()).await.unwrap();

    let table = outcome.table("customers").unwrap();
    assert_eq!(read(&table.path), "id,email\n1,a@b.c\n");
    assert_eq!(table.rows_written, None);

    let manifest = TableManifest::read_from(&dir.path().join("customers.csv.manifest")).unwrap();
    assert_eq!(manifest.primary_key, vec!["id"]);
    assert_eq!(manifest.columns, None);
    assert!(manifest.incremental);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"campaigns": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/segments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({"site_id": "s", "#api_secret": "k", "campaigns": true, "segments": true}),
        dir.path(),
    );

    let err = extractor.run(ExtractorState::new()).await.unwrap_err();
    assert!(matches!(err, Error::ApiRequest { status: 500, .. }));
    assert!(dir.path().join("campaigns.csv.manifest").exists());
    assert!(!dir.path().join("segments.csv.manifest").exists());
}

#[tokio::test]
async fn test_vendor_errors_abort_activities() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errors": [{"detail": "bad type"}], "activities": []})),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let extractor = extractor_for(
        &server,
        json!({
            "site_id": "s",
            "#api_secret": "k",
            "activities": [{"types": ["page"], "mode": "PARSED_DATA"}]
        }),
        dir.path(),
    );

    let err = extractor.run(ExtractorState::new()).await.unwrap_err();
    assert!(matches!(err, Error::ApiResponse { .. }));
}

#[test]
fn test_from_config_requires_secret() {
    let config = ExtractorConfig::from_value(json!({"site_id": "s"})).unwrap();
    let result = Extractor::from_config(config, "/tmp/out");
    assert!(matches!(result, Err(Error::MissingConfigField { .. })));
}
