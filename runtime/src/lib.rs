//! # Ticket History Runtime
//!
//! The update/propagation pipeline of the ticket history service.
//!
//! - [`TicketService`](service::TicketService): lifecycle rules over an
//!   injected [`TicketRepository`](ticket_history_core::TicketRepository)
//! - [`Notifier`](notifier::Notifier): detached, time-bounded delivery to the
//!   configured [`EventSink`](ticket_history_core::EventSink)
//! - [`authorization`]: the caller-identity rule enforced by the RPC update
//! - [`metrics`]: counters and histograms plus the Prometheus recorder
//!
//! # Update pipeline
//!
//! ```text
//! load ──► authorize (RPC) ──► whitelist ──► validate status ──► persist
//!                                                                  │
//!                      response ◄── re-fetch ◄─────────────────────┘
//!                                      │
//!                                      └──► Notifier (spawned, 5s budget)
//! ```

pub mod authorization;
pub mod metrics;
pub mod notifier;
pub mod service;

pub use authorization::{CALLER_ID_METADATA, authorize_update};
pub use notifier::{DeliveryOutcome, DispatchHandle, NOTIFICATION_TIMEOUT, Notifier};
pub use service::{SnapshotPolicy, TicketService, UpdateAccess};
