//! Axum REST surface for the ticket history service.
//!
//! Handlers are thin: they parse the request, call
//! [`TicketService`](ticket_history_runtime::TicketService), and map
//! [`TicketError`](ticket_history_core::TicketError) to a status code through
//! [`AppError`].
//!
//! # Request Flow
//!
//! 1. **Request id** assigned by [`middleware::request_id_layer`]
//! 2. **Extract** path id and JSON body ([`extractors`])
//! 3. **Call** the ticket service
//! 4. **Map** the result to a JSON response or `{code, message}` error
//!
//! # Example
//!
//! ```ignore
//! use ticket_history_web::{AppState, router};
//!
//! let app = router(AppState::new(service).with_probe(repository));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8097").await?;
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{ApiJson, TicketIdPath};
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
