//! Event sinks for asserting on notifications.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ticket_history_core::sink::DeliveryFuture;
use ticket_history_core::{EventSink, SinkError, TicketEvent};
use tokio::sync::Notify;

/// Captures every delivered event.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<TicketEvent>>>,
    delivered: Arc<Notify>,
    delay: Option<Duration>,
}

impl RecordingEventSink {
    /// Sink that records immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that waits `delay` before recording each event.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Events recorded so far, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<TicketEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until at least `count` events were recorded.
    ///
    /// Returns the recorded events, or `None` if `timeout` elapsed first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Option<Vec<TicketEvent>> {
        tokio::time::timeout(timeout, async {
            loop {
                let delivered = self.delivered.notified();
                let events = self.events();
                if events.len() >= count {
                    return events;
                }
                delivered.await;
            }
        })
        .await
        .ok()
    }
}

impl EventSink for RecordingEventSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, event: &TicketEvent) -> DeliveryFuture<'_> {
        let event = event.clone();
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.events.lock().unwrap().push(event);
            self.delivered.notify_waiters();
            Ok(())
        })
    }
}

/// Fails every delivery with a transport error, like an unreachable broker.
#[derive(Clone, Default)]
pub struct FailingEventSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingEventSink {
    /// New failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries attempted so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventSink for FailingEventSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn deliver(&self, _event: &TicketEvent) -> DeliveryFuture<'_> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(SinkError::Transport("connection refused".to_string())) })
    }
}

/// Never completes a delivery, like a peer that accepts the connection and
/// then goes silent.
#[derive(Clone, Default)]
pub struct StalledEventSink {
    attempts: Arc<AtomicUsize>,
}

impl StalledEventSink {
    /// New stalled sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries started so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventSink for StalledEventSink {
    fn name(&self) -> &'static str {
        "stalled"
    }

    fn deliver(&self, _event: &TicketEvent) -> DeliveryFuture<'_> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }
}
