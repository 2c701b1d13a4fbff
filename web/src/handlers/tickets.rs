//! `/api/v1/tickets` handlers.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::{ApiJson, TicketIdPath};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use ticket_history_core::{
    CreateTicket, Page, Ticket, TicketChanges, TicketField, TicketFilter, TicketPage,
};
use ticket_history_runtime::UpdateAccess;

/// `POST /api/v1/tickets`
///
/// # Errors
///
/// `400` for an unparseable body or failed validation, `500` on storage failure.
pub async fn create_ticket(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTicket>,
) -> WebResult<(StatusCode, Json<Ticket>)> {
    let ticket = state.service().create(request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// `GET /api/v1/tickets/{id}`
///
/// # Errors
///
/// `400` for a bad id, `404` when the ticket does not exist.
pub async fn get_ticket(
    State(state): State<AppState>,
    TicketIdPath(id): TicketIdPath,
) -> WebResult<Json<Ticket>> {
    Ok(Json(state.service().get(id).await?))
}

/// `GET /api/v1/tickets?client_id=&operator_id=&status=&region=&limit=&offset=`
///
/// Unknown parameters are ignored. `limit` and `offset` that do not parse
/// fall back to no limit and zero.
///
/// # Errors
///
/// `500` on storage failure.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> WebResult<Json<TicketPage>> {
    let page = Page::new(lenient_int(&params, "limit"), lenient_int(&params, "offset"));
    let filter = TicketFilter::from_pairs(params);
    Ok(Json(state.service().list(&filter, page).await?))
}

/// `PUT /api/v1/tickets/{id}`
///
/// The body is a JSON object. Allow-listed keys must carry strings (`null`
/// means "leave unchanged"); every other key is ignored.
///
/// # Errors
///
/// `400` for a bad id, an unparseable body or no effective change, `404`
/// when the ticket does not exist.
pub async fn update_ticket(
    State(state): State<AppState>,
    TicketIdPath(id): TicketIdPath,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> WebResult<Json<Ticket>> {
    let changes = changes_from_body(body)?;
    let ticket = state
        .service()
        .update(id, changes, &UpdateAccess::Unrestricted)
        .await?;
    Ok(Json(ticket))
}

fn lenient_int(params: &HashMap<String, String>, key: &str) -> i64 {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn changes_from_body(body: Map<String, Value>) -> WebResult<TicketChanges> {
    let mut changes = TicketChanges::new();
    for (key, value) in body {
        match value {
            Value::String(text) => changes.insert(key, text),
            Value::Null => {},
            _ if TicketField::from_key(&key).is_some() => {
                return Err(AppError::bad_request("invalid body"));
            },
            _ => {},
        }
    }
    Ok(changes)
}
