//! Tests for the event sink doubles.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Utc;
use std::time::Duration;
use ticket_history_core::{EventSink, Ticket, TicketEvent, TicketEventKind, TicketId, TicketStatus};
use ticket_history_testing::{FailingEventSink, RecordingEventSink, StalledEventSink};

fn event(id: i64) -> TicketEvent {
    let now = Utc::now();
    let ticket = Ticket {
        id: TicketId::new(id),
        session_id: "s1".into(),
        client_id: "c1".into(),
        operator_id: "op".into(),
        status: TicketStatus::InProgress,
        priority: String::new(),
        region: String::new(),
        subject: "subject".into(),
        notes: String::new(),
        created_at: now,
        updated_at: now,
        closed_at: None,
    };
    TicketEvent::new(TicketEventKind::Updated, &ticket)
}

#[tokio::test]
async fn recording_sink_keeps_delivery_order() {
    let sink = RecordingEventSink::new();
    sink.deliver(&event(1)).await.unwrap();
    sink.deliver(&event(2)).await.unwrap();

    let ids: Vec<i64> = sink.events().iter().map(|e| e.ticket_id.get()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn wait_for_sees_deliveries_from_other_tasks() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(20));
    let background = sink.clone();
    tokio::spawn(async move { background.deliver(&event(7)).await });

    let events = sink
        .wait_for(1, Duration::from_secs(2))
        .await
        .expect("delivery observed");
    assert_eq!(events[0].ticket_id, TicketId::new(7));
}

#[tokio::test]
async fn wait_for_gives_up_after_timeout() {
    let sink = RecordingEventSink::new();
    assert!(sink.wait_for(1, Duration::from_millis(20)).await.is_none());
}

#[tokio::test]
async fn failing_sink_counts_attempts() {
    let sink = FailingEventSink::new();
    assert!(sink.deliver(&event(1)).await.is_err());
    assert_eq!(sink.attempts(), 1);
}

#[tokio::test]
async fn stalled_sink_never_finishes() {
    let sink = StalledEventSink::new();
    let outcome = tokio::time::timeout(Duration::from_millis(20), sink.deliver(&event(1))).await;
    assert!(outcome.is_err());
    assert_eq!(sink.attempts(), 1);
}
