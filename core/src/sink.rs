//! Change-notification port.
//!
//! An [`EventSink`] delivers one [`TicketEvent`] to the search subsystem.
//! Exactly one sink is selected at startup and shared for the process
//! lifetime. Callers never see sink failures: the dispatcher in the runtime
//! crate bounds every delivery with its own timeout and logs the outcome.
//!
//! # Implementations
//!
//! - `RedpandaEventSink` (Kafka-compatible topic)
//! - `SearchIndexClient` (HTTP push)
//! - [`NoopEventSink`] (nothing configured)

use crate::event::TicketEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors a sink can report for a single delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The event could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Network or broker failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The receiver answered with a non-success status
    #[error("Rejected with status {status}: {body}")]
    Rejected {
        /// Status code returned by the receiver
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },
}

/// Future returned by [`EventSink::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Delivers ticket change notifications.
///
/// Implementations must be safe to share across tasks; the same instance
/// serves every request.
pub trait EventSink: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Whether this sink drops everything. The dispatcher skips spawning
    /// work for no-op sinks.
    fn is_noop(&self) -> bool {
        false
    }

    /// Deliver one notification, at most once.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the notification could not be delivered.
    fn deliver(&self, event: &TicketEvent) -> DeliveryFuture<'_>;
}

/// Sink used when no transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_noop(&self) -> bool {
        true
    }

    fn deliver(&self, event: &TicketEvent) -> DeliveryFuture<'_> {
        tracing::trace!(ticket_id = %event.ticket_id, event = %event.event, "No sink configured, dropping notification");
        Box::pin(async { Ok(()) })
    }
}
