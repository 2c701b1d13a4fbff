//! Route table.

use crate::handlers;
use crate::middleware::{request_id_layer, trace_layer};
use crate::state::AppState;
use axum::{
    Router,
    routing::get,
};

/// Build the HTTP application.
///
/// ```text
/// POST /api/v1/tickets        create
/// GET  /api/v1/tickets        list
/// GET  /api/v1/tickets/:id    get
/// PUT  /api/v1/tickets/:id    update
/// GET  /health | /ready | /metrics
/// ```
pub fn router(state: AppState) -> Router {
    let tickets = Router::new()
        .route(
            "/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(handlers::get_ticket).put(handlers::update_ticket),
        );

    Router::new()
        .nest("/api/v1", tickets)
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}
