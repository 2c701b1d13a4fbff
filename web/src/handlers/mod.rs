//! HTTP request handlers.

pub mod health;
pub mod tickets;

pub use health::{health_check, metrics, readiness_check};
pub use tickets::{create_ticket, get_ticket, list_tickets, update_ticket};
