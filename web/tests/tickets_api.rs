//! REST surface tests against the in-memory repository.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use ticket_history_core::{HealthCheck, ReadinessProbe, TicketEventKind};
use ticket_history_runtime::{Notifier, TicketService};
use ticket_history_testing::{InMemoryTicketRepository, RecordingEventSink};
use ticket_history_web::{AppState, REQUEST_ID_HEADER, router};

struct Harness {
    server: TestServer,
    repository: InMemoryTicketRepository,
    sink: RecordingEventSink,
}

fn harness() -> Harness {
    let repository = InMemoryTicketRepository::new();
    let sink = RecordingEventSink::new();
    let service = TicketService::new(
        Arc::new(repository.clone()),
        Notifier::new(Arc::new(sink.clone())),
    );
    let server = TestServer::new(router(AppState::new(Arc::new(service)))).unwrap();
    Harness {
        server,
        repository,
        sink,
    }
}

async fn create(server: &TestServer, body: Value) -> Value {
    let response = server.post("/api/v1/tickets").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn create_returns_201_with_defaults() {
    let h = harness();

    let ticket = create(&h.server, json!({"session_id": "s1", "client_id": "c1"})).await;

    assert!(ticket["id"].as_i64().unwrap() > 0);
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["operator_id"], "");
    assert!(ticket.get("closed_at").is_none());

    let events = h.sink.wait_for(1, Duration::from_secs(2)).await.unwrap();
    assert_eq!(events[0].event, TicketEventKind::Created);
}

#[tokio::test]
async fn create_rejects_missing_identifiers_and_bad_status() {
    let h = harness();

    let response = h
        .server
        .post("/api/v1/tickets")
        .json(&json!({"session_id": "s1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "invalid body");

    let response = h
        .server
        .post("/api/v1/tickets")
        .json(&json!({"session_id": "s1", "client_id": "c1", "status": "pending"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");

    let response = h
        .server
        .post("/api/v1/tickets")
        .json(&json!({"session_id": " ", "client_id": "c1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert!(h.repository.is_empty());
}

#[tokio::test]
async fn get_handles_bad_and_missing_ids() {
    let h = harness();

    let response = h.server.get("/api/v1/tickets/abc").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "invalid id");

    let response = h.server.get("/api/v1/tickets/0").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h.server.get("/api/v1/tickets/77").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_returns_created_ticket() {
    let h = harness();
    let created = create(&h.server, json!({"session_id": "s1", "client_id": "c1", "subject": "hi"})).await;

    let response = h
        .server
        .get(&format!("/api/v1/tickets/{}", created["id"]))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), created);
}

#[tokio::test]
async fn list_filters_paginates_and_counts() {
    let h = harness();
    for (session, client, region) in [("s1", "c1", "eu"), ("s2", "C1", "EU"), ("s3", "c2", "eu")] {
        create(
            &h.server,
            json!({"session_id": session, "client_id": client, "region": region}),
        )
        .await;
    }

    let response = h
        .server
        .get("/api/v1/tickets")
        .add_query_param("client_id", "c1")
        .add_query_param("subject", "ignored")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page = response.json::<Value>();
    assert_eq!(page["total"], 2);
    assert_eq!(page["tickets"].as_array().unwrap().len(), 2);

    let response = h
        .server
        .get("/api/v1/tickets")
        .add_query_param("region", "eu")
        .add_query_param("limit", "1")
        .add_query_param("offset", "1")
        .await;
    let page = response.json::<Value>();
    assert_eq!(page["total"], 3);
    let tickets = page["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["session_id"], "s2");
}

#[tokio::test]
async fn list_ignores_unparseable_pagination() {
    let h = harness();
    create(&h.server, json!({"session_id": "s1", "client_id": "c1"})).await;
    create(&h.server, json!({"session_id": "s2", "client_id": "c1"})).await;

    let response = h
        .server
        .get("/api/v1/tickets")
        .add_query_param("limit", "lots")
        .add_query_param("offset", "-3")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["tickets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn update_applies_only_allow_listed_fields() {
    let h = harness();
    let created = create(&h.server, json!({"session_id": "s1", "client_id": "c1"})).await;
    let path = format!("/api/v1/tickets/{}", created["id"]);

    let response = h
        .server
        .put(&path)
        .json(&json!({"status": "closed", "notes": "done", "client_id": "mallory", "id": "9"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated = response.json::<Value>();
    assert_eq!(updated["status"], "closed");
    assert_eq!(updated["notes"], "done");
    assert_eq!(updated["client_id"], "c1");
    assert_eq!(updated["id"], created["id"]);
    assert!(updated["closed_at"].is_string());

    let events = h.sink.wait_for(2, Duration::from_secs(2)).await.unwrap();
    let updated_event = events
        .iter()
        .find(|e| e.event == TicketEventKind::Updated)
        .expect("update notification");
    assert_eq!(updated_event.notes, "done");
}

#[tokio::test]
async fn update_rejections() {
    let h = harness();
    let created = create(&h.server, json!({"session_id": "s1", "client_id": "c1"})).await;
    let path = format!("/api/v1/tickets/{}", created["id"]);
    let writes = h.repository.write_count();

    let response = h.server.put(&path).json(&json!({"client_id": "x"})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "no changes provided");

    let response = h.server.put(&path).json(&json!({"status": "resolved"})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h.server.put(&path).json(&json!(["not", "an", "object"])).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .put("/api/v1/tickets/999")
        .json(&json!({"notes": "x"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    assert_eq!(h.repository.write_count(), writes);
}

#[tokio::test]
async fn storage_failure_is_a_generic_500() {
    let h = harness();
    h.repository.set_unavailable(true);

    let response = h.server.get("/api/v1/tickets").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let h = harness();

    let response = h.server.get("/health").await;
    assert!(!response.header(REQUEST_ID_HEADER).is_empty());

    let response = h
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_static("trace-me"),
        )
        .await;
    assert_eq!(response.header(REQUEST_ID_HEADER), "trace-me");
}

#[tokio::test]
async fn health_reports_service_and_version() {
    let h = harness();

    let response = h.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ticket-history");
    assert!(body["version"].is_string());
    assert!(body["time"].is_string());
}

struct StaticProbe(HealthCheck);

impl ReadinessProbe for StaticProbe {
    fn check(&self) -> Pin<Box<dyn Future<Output = HealthCheck> + Send + '_>> {
        let check = self.0.clone();
        Box::pin(async move { check })
    }
}

#[tokio::test]
async fn ready_reflects_probes() {
    let service = Arc::new(TicketService::new(
        Arc::new(InMemoryTicketRepository::new()),
        Notifier::disabled(),
    ));

    let healthy = AppState::new(Arc::clone(&service))
        .with_probe(Arc::new(StaticProbe(HealthCheck::healthy("database"))));
    let server = TestServer::new(router(healthy)).unwrap();
    let response = server.get("/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "healthy");

    let unhealthy = AppState::new(service)
        .with_probe(Arc::new(StaticProbe(HealthCheck::unhealthy("database", "refused"))));
    let server = TestServer::new(router(unhealthy)).unwrap();
    let response = server.get("/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["checks"][0]["message"], "refused");
}

#[tokio::test]
async fn metrics_without_recorder_is_404() {
    let h = harness();
    let response = h.server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
