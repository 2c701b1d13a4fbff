//! # Ticket History Core
//!
//! Domain types and ports for the ticket history service.
//!
//! This crate has no I/O of its own. It defines:
//!
//! - The [`Ticket`](ticket::Ticket) entity and its closed status vocabulary
//! - The update and list allow-lists ([`changes`], [`filter`])
//! - The storage port ([`repository::TicketRepository`])
//! - The change-notification port ([`sink::EventSink`]) and its wire shape ([`event`])
//! - The error taxonomy shared by every transport ([`error::TicketError`])
//!
//! ## Architecture
//!
//! ```text
//!  HTTP / gRPC handler
//!          │
//!          ▼
//!   Ticket Service ──► TicketRepository (Postgres / in-memory)
//!          │
//!          ▼ (detached, 5s budget)
//!      EventSink (Kafka / HTTP / no-op)
//! ```
//!
//! Every allow-listed key is parsed into a closed enum before it can reach a
//! storage adapter, so adapters only ever see static column names.

pub mod changes;
pub mod error;
pub mod event;
pub mod filter;
pub mod health;
pub mod repository;
pub mod sink;
pub mod ticket;

pub use changes::{TicketChanges, TicketField, TicketPatch};
pub use error::{Result, TicketError};
pub use event::{TicketEvent, TicketEventKind};
pub use filter::{FilterColumn, Page, TicketFilter, TicketPage};
pub use health::{HealthCheck, HealthReport, HealthStatus, ReadinessProbe};
pub use repository::{RepositoryFuture, TicketRepository};
pub use sink::{DeliveryFuture, EventSink, NoopEventSink, SinkError};
pub use ticket::{CreateTicket, NewTicket, Ticket, TicketId, TicketStatus};

/// Environment module - injectable dependencies for deterministic tests
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use ticket_history_core::environment::Clock;
    ///
    /// struct FrozenClock(DateTime<Utc>);
    ///
    /// impl Clock for FrozenClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.0
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
