//! # Ticket History Server
//!
//! Process wiring for the ticket history service.
//!
//! - [`config`]: typed configuration from the environment
//! - [`sinks`]: picks the change-notification transport (Kafka, HTTP or none)
//! - [`bootstrap`]: database, service, listeners and graceful shutdown
//! - [`reindex`]: pushes every stored ticket through the configured sink
//!
//! Binaries: `ticket-history` (REST + gRPC), `migrate`, `reindex-search`.

pub mod bootstrap;
pub mod config;
pub mod reindex;
pub mod sinks;

pub use bootstrap::{Application, BootstrapError, DEFAULT_LOG_FILTER, init_tracing};
pub use config::{Config, ConfigError, Environment};
pub use reindex::{ReindexSummary, reindex};
pub use sinks::select_sink;
