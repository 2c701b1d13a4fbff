//! Detached, time-bounded change notification.
//!
//! [`Notifier::dispatch`] spawns one delivery on the tokio runtime and returns
//! at once. The spawned task is not tied to the request that triggered it:
//! dropping the request future (client disconnect, handler timeout) does not
//! cancel the notification. Each delivery gets its own
//! [`NOTIFICATION_TIMEOUT`] budget and every failure ends here, logged and
//! counted, never returned to a caller and never retried.
//!
//! The notifier counts deliveries in flight so shutdown can wait for them.

use crate::metrics::{NOTIFICATION_DURATION_SECONDS, NOTIFICATIONS_TOTAL};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use ticket_history_core::{EventSink, NoopEventSink, Ticket, TicketEvent, TicketEventKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Budget for a single delivery.
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The sink acknowledged the notification
    Delivered,
    /// The sink reported an error
    Failed,
    /// The sink did not answer within the budget
    TimedOut,
    /// No sink is configured
    Skipped,
}

impl DeliveryOutcome {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
        }
    }
}

/// Handle to a spawned delivery.
///
/// Dropping it detaches the delivery; it keeps running. Tests await
/// [`DispatchHandle::outcome`] to observe the result.
#[derive(Debug)]
pub struct DispatchHandle(Option<JoinHandle<DeliveryOutcome>>);

impl DispatchHandle {
    const fn skipped() -> Self {
        Self(None)
    }

    /// Wait for the delivery to finish.
    pub async fn outcome(self) -> DeliveryOutcome {
        match self.0 {
            None => DeliveryOutcome::Skipped,
            Some(task) => task.await.unwrap_or(DeliveryOutcome::Failed),
        }
    }
}

/// Dispatches ticket change notifications to the configured sink.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn EventSink>,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl Notifier {
    /// Notifier over `sink` with the standard budget.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_timeout(sink, NOTIFICATION_TIMEOUT)
    }

    /// Notifier over `sink` with a custom budget.
    #[must_use]
    pub fn with_timeout(sink: Arc<dyn EventSink>, timeout: Duration) -> Self {
        let (idle, _) = watch::channel(());
        Self {
            sink,
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(idle),
        }
    }

    /// Notifier that drops everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopEventSink))
    }

    /// Name of the underlying sink.
    #[must_use]
    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Whether a real sink is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.sink.is_noop()
    }

    /// Deliveries currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Spawn a delivery of `kind` for `ticket` and return immediately.
    ///
    /// Must be called only after the change is persisted.
    pub fn dispatch(&self, kind: TicketEventKind, ticket: &Ticket) -> DispatchHandle {
        if self.sink.is_noop() {
            return DispatchHandle::skipped();
        }

        let event = TicketEvent::new(kind, ticket);
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;
        let guard = InFlightGuard::enter(self);
        let span = tracing::info_span!(
            "ticket_notification",
            ticket_id = %event.ticket_id,
            event = %event.event,
            sink = sink.name(),
        );

        let task = tokio::spawn(
            async move {
                let _guard = guard;
                deliver(sink.as_ref(), &event, timeout).await
            }
            .instrument(span),
        );
        DispatchHandle(Some(task))
    }

    /// Deliver in the caller's task, still bounded by the budget.
    ///
    /// Used by batch jobs that want back-pressure instead of fan-out.
    pub async fn deliver_now(&self, kind: TicketEventKind, ticket: &Ticket) -> DeliveryOutcome {
        if self.sink.is_noop() {
            return DeliveryOutcome::Skipped;
        }
        let event = TicketEvent::new(kind, ticket);
        deliver(self.sink.as_ref(), &event, self.timeout).await
    }

    /// Wait until no delivery is running, up to `limit`.
    ///
    /// Returns `false` if deliveries were still running when `limit` elapsed.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let mut idle = self.idle.subscribe();
        tokio::time::timeout(limit, async {
            while self.in_flight.load(Ordering::SeqCst) > 0 {
                if idle.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.name())
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

async fn deliver(sink: &dyn EventSink, event: &TicketEvent, timeout: Duration) -> DeliveryOutcome {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, sink.deliver(event)).await {
        Ok(Ok(())) => {
            tracing::debug!("Notification delivered");
            DeliveryOutcome::Delivered
        }
        Ok(Err(error)) => {
            tracing::warn!(error = %error, "Notification delivery failed");
            DeliveryOutcome::Failed
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Notification delivery timed out"
            );
            DeliveryOutcome::TimedOut
        }
    };

    metrics::counter!(NOTIFICATIONS_TOTAL, "sink" => sink.name(), "outcome" => outcome.as_str())
        .increment(1);
    metrics::histogram!(NOTIFICATION_DURATION_SECONDS, "sink" => sink.name())
        .record(started.elapsed().as_secs_f64());
    outcome
}

/// Decrements the in-flight count on drop, even if the delivery panics.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl InFlightGuard {
    fn enter(notifier: &Notifier) -> Self {
        notifier.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            in_flight: Arc::clone(&notifier.in_flight),
            idle: Arc::clone(&notifier.idle),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.send_replace(());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ticket_history_core::{TicketId, TicketStatus};
    use ticket_history_testing::{FailingEventSink, RecordingEventSink, StalledEventSink};

    fn ticket() -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(9),
            session_id: "s1".into(),
            client_id: "c1".into(),
            operator_id: String::new(),
            status: TicketStatus::Open,
            priority: String::new(),
            region: String::new(),
            subject: "hello".into(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn delivers_snapshot_to_sink() {
        let sink = RecordingEventSink::new();
        let notifier = Notifier::new(Arc::new(sink.clone()));

        let outcome = notifier.dispatch(TicketEventKind::Created, &ticket()).outcome().await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, TicketEventKind::Created);
        assert_eq!(events[0].subject, "hello");
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let sink = FailingEventSink::new();
        let notifier = Notifier::new(Arc::new(sink.clone()));

        let outcome = notifier.dispatch(TicketEventKind::Updated, &ticket()).outcome().await;
        assert_eq!(outcome, DeliveryOutcome::Failed);
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sink_is_cut_off_by_the_budget() {
        let notifier = Notifier::new(Arc::new(StalledEventSink::new()));

        let handle = notifier.dispatch(TicketEventKind::Updated, &ticket());
        assert_eq!(notifier.in_flight(), 1);
        assert_eq!(handle.outcome().await, DeliveryOutcome::TimedOut);
        assert_eq!(notifier.in_flight(), 0);
    }

    #[tokio::test]
    async fn noop_sink_spawns_nothing() {
        let notifier = Notifier::disabled();
        let handle = notifier.dispatch(TicketEventKind::Created, &ticket());
        assert_eq!(notifier.in_flight(), 0);
        assert_eq!(handle.outcome().await, DeliveryOutcome::Skipped);
        assert_eq!(
            notifier.deliver_now(TicketEventKind::Created, &ticket()).await,
            DeliveryOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel_delivery() {
        let sink = RecordingEventSink::with_delay(Duration::from_millis(30));
        let notifier = Notifier::new(Arc::new(sink.clone()));

        drop(notifier.dispatch(TicketEventKind::Updated, &ticket()));

        assert!(sink.wait_for(1, Duration::from_secs(2)).await.is_some());
    }

    #[tokio::test]
    async fn wait_idle_tracks_in_flight_deliveries() {
        let sink = RecordingEventSink::with_delay(Duration::from_millis(30));
        let notifier = Notifier::new(Arc::new(sink.clone()));

        assert!(notifier.wait_idle(Duration::from_millis(1)).await);
        let _ = notifier.dispatch(TicketEventKind::Updated, &ticket());
        let _ = notifier.dispatch(TicketEventKind::Updated, &ticket());
        assert!(notifier.wait_idle(Duration::from_secs(2)).await);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_gives_up_on_stalled_deliveries() {
        let notifier = Notifier::with_timeout(Arc::new(StalledEventSink::new()), Duration::from_secs(60));
        let _ = notifier.dispatch(TicketEventKind::Updated, &ticket());
        assert!(!notifier.wait_idle(Duration::from_secs(1)).await);
    }
}
