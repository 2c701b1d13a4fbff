//! Change notifications sent to the search subsystem.
//!
//! The wire shape is identical for every sink:
//!
//! ```json
//! {"event":"ticket.updated","ticket_id":42,"session_id":"s1","client_id":"c1",
//!  "operator_id":"","subject":"","notes":"","status":"closed"}
//! ```

use crate::ticket::{Ticket, TicketId, TicketStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketEventKind {
    /// A ticket was created
    #[serde(rename = "ticket.created")]
    Created,
    /// A ticket was updated
    #[serde(rename = "ticket.updated")]
    Updated,
}

impl TicketEventKind {
    /// Event tag on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "ticket.created",
            Self::Updated => "ticket.updated",
        }
    }
}

impl fmt::Display for TicketEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a ticket taken after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEvent {
    /// Event tag
    pub event: TicketEventKind,
    /// Ticket identifier
    pub ticket_id: TicketId,
    /// Session reference
    pub session_id: String,
    /// Client identifier
    pub client_id: String,
    /// Operator identifier
    pub operator_id: String,
    /// Subject
    pub subject: String,
    /// Notes
    pub notes: String,
    /// Status
    pub status: TicketStatus,
}

impl TicketEvent {
    /// Snapshot `ticket` for `kind`.
    #[must_use]
    pub fn new(kind: TicketEventKind, ticket: &Ticket) -> Self {
        Self {
            event: kind,
            ticket_id: ticket.id,
            session_id: ticket.session_id.clone(),
            client_id: ticket.client_id.clone(),
            operator_id: ticket.operator_id.clone(),
            subject: ticket.subject.clone(),
            notes: ticket.notes.clone(),
            status: ticket.status,
        }
    }

    /// Partition key: notifications for one ticket share a key.
    #[must_use]
    pub fn key(&self) -> String {
        self.ticket_id.to_string()
    }

    /// Serialize to the JSON wire shape.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
