//! `PostgreSQL` storage adapter for the ticket history service.
//!
//! This crate implements the [`TicketRepository`] port from
//! `ticket-history-core` on top of sqlx. It provides:
//!
//! - [`PostgresTicketRepository`]: the repository itself
//! - [`connect`]: a pool with per-connection `statement_timeout`
//! - [`ensure_database`] and [`migrate`]: schema bootstrap
//!
//! Filter and update statements are assembled with [`sqlx::QueryBuilder`].
//! Column names come only from the allow-list enums in the core crate;
//! every value is a bound parameter.
//!
//! # Example
//!
//! ```no_run
//! use ticket_history_postgres::{PoolSettings, PostgresTicketRepository, connect, migrate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("postgres://localhost/ticket_service", &PoolSettings::default()).await?;
//! migrate(&pool).await?;
//! let repository = PostgresTicketRepository::new(pool);
//! # Ok(())
//! # }
//! ```
//!
//! [`TicketRepository`]: ticket_history_core::TicketRepository

mod pool;
mod repository;

pub use pool::{PoolSettings, StorageError, connect, ensure_database, migrate};
pub use repository::PostgresTicketRepository;
