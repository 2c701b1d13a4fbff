//! Conversions between protobuf messages and domain types.

use crate::proto;
use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use ticket_history_core::{
    CreateTicket, FilterColumn, Page, Ticket, TicketChanges, TicketField, TicketFilter,
};

/// Protobuf timestamp for a UTC instant.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: i32::try_from(at.timestamp_subsec_nanos()).unwrap_or_default(),
    }
}

impl From<Ticket> for proto::Ticket {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id.get(),
            session_id: ticket.session_id,
            client_id: ticket.client_id,
            operator_id: ticket.operator_id,
            status: ticket.status.to_string(),
            priority: ticket.priority,
            region: ticket.region,
            subject: ticket.subject,
            notes: ticket.notes,
            created_at: Some(timestamp(ticket.created_at)),
            updated_at: Some(timestamp(ticket.updated_at)),
            closed_at: ticket.closed_at.map(timestamp),
        }
    }
}

impl From<proto::CreateTicketRequest> for CreateTicket {
    fn from(request: proto::CreateTicketRequest) -> Self {
        Self {
            session_id: request.session_id,
            client_id: request.client_id,
            operator_id: request.operator_id,
            status: Some(request.status).filter(|s| !s.is_empty()),
            priority: request.priority,
            region: request.region,
            subject: request.subject,
            notes: request.notes,
        }
    }
}

/// Filter and page window of a list request.
#[must_use]
pub fn list_query(request: &proto::ListTicketsRequest) -> (TicketFilter, Page) {
    let filter = TicketFilter::new()
        .with(FilterColumn::ClientId, request.client_id.as_str())
        .with(FilterColumn::OperatorId, request.operator_id.as_str())
        .with(FilterColumn::Status, request.status.as_str())
        .with(FilterColumn::Region, request.region.as_str());
    let page = Page::new(i64::from(request.limit), i64::from(request.offset));
    (filter, page)
}

/// Change set of an update request. Empty strings are "not provided".
#[must_use]
pub fn update_changes(request: proto::UpdateTicketRequest) -> TicketChanges {
    [
        (TicketField::Subject, request.subject),
        (TicketField::Notes, request.notes),
        (TicketField::Status, request.status),
        (TicketField::Priority, request.priority),
        (TicketField::Region, request.region),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(field, value)| (field.column(), value))
    .collect()
}
