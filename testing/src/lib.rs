//! # Ticket History Testing
//!
//! Test doubles for the ticket history service.
//!
//! This crate provides:
//! - [`InMemoryTicketRepository`]: the storage port backed by a `BTreeMap`
//! - [`RecordingEventSink`], [`FailingEventSink`], [`StalledEventSink`]: sinks
//!   that capture, reject, or never finish deliveries
//! - [`FixedClock`] and [`SteppingClock`]: deterministic time
//! - [`strategies`]: proptest strategies for create requests
//!
//! ## Example
//!
//! ```
//! use ticket_history_core::{CreateTicket, TicketRepository};
//! use ticket_history_testing::InMemoryTicketRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = InMemoryTicketRepository::new();
//! let ticket = repository
//!     .create(&CreateTicket::new("s1", "c1").validate()?)
//!     .await?;
//! assert_eq!(repository.get(ticket.id).await?, Some(ticket));
//! # Ok(())
//! # }
//! ```

pub mod repository;
pub mod sinks;

pub use mocks::{FixedClock, SteppingClock, test_clock};
pub use repository::InMemoryTicketRepository;
pub use sinks::{FailingEventSink, RecordingEventSink, StalledEventSink};

/// Mock implementations of Environment traits.
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;
    use ticket_history_core::environment::Clock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_history_testing::mocks::FixedClock;
    /// use ticket_history_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by `step` on every read.
    ///
    /// Lets tests assert `updated_at > created_at` without sleeping.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` per call.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let current = *next;
            *next = current + self.step;
            current
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod strategies {
    use proptest::prelude::*;
    use ticket_history_core::{CreateTicket, TicketStatus};

    /// Any accepted status.
    pub fn status() -> impl Strategy<Value = TicketStatus> {
        prop::sample::select(TicketStatus::ALL.to_vec())
    }

    /// Create requests that pass validation.
    pub fn valid_create_ticket() -> impl Strategy<Value = CreateTicket> {
        (
            "[a-z0-9]{1,12}",
            "[a-z0-9]{1,12}",
            "[a-z0-9]{0,12}",
            prop::option::of(status()),
            "(low|medium|high)?",
            "[a-z]{0,6}",
            "[ -~]{0,40}",
            "[ -~]{0,80}",
        )
            .prop_map(
                |(session_id, client_id, operator_id, status, priority, region, subject, notes)| {
                    CreateTicket {
                        session_id,
                        client_id,
                        operator_id,
                        status: status.map(|s| s.as_str().to_string()),
                        priority,
                        region,
                        subject,
                        notes,
                    }
                },
            )
    }
}
