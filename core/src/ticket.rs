//! The ticket entity and its status vocabulary.

use crate::changes::TicketField;
use crate::error::{Result, TicketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned ticket identifier.
///
/// Identifiers are positive and never reused. The store hands them out at
/// creation time; callers only ever parse them from requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(i64);

impl TicketId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Accept an identifier coming from a request.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] when the value is not positive.
    pub fn from_request(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(TicketError::invalid_input("id must be greater than 0"))
        }
    }

    /// Parse a path segment such as `"42"`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] for non-numeric or non-positive input.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(TicketError::invalid_input("invalid id")),
        }
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ticket status. The set is closed: nothing else is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Newly raised, not yet picked up
    #[default]
    Open,
    /// An operator is working on it
    InProgress,
    /// Resolved
    Closed,
}

impl TicketStatus {
    /// Every accepted status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Closed];

    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }

    /// Parse a status value received from a caller or read from storage.
    ///
    /// Matching is exact; `"Closed"` is not a status.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] for any value outside the vocabulary.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            _ => Err(TicketError::invalid_input(
                "invalid status: must be 'open', 'in_progress', or 'closed'",
            )),
        }
    }

    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier
    pub id: TicketId,
    /// Session the ticket was raised from
    pub session_id: String,
    /// Client that raised the ticket
    pub client_id: String,
    /// Assigned operator, empty when unassigned
    pub operator_id: String,
    /// Current status
    pub status: TicketStatus,
    /// Free-form priority label
    pub priority: String,
    /// Free-form region label
    pub region: String,
    /// Short summary
    pub subject: String,
    /// Long-form notes
    pub notes: String,
    /// Creation time, never changes
    pub created_at: DateTime<Utc>,
    /// Time of the last accepted mutation
    pub updated_at: DateTime<Utc>,
    /// Set while the ticket is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Create request as received from a transport.
///
/// `status` is still raw text here; [`CreateTicket::validate`] turns it into a
/// [`NewTicket`] that storage adapters can trust.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateTicket {
    /// Mandatory session reference
    pub session_id: String,
    /// Mandatory client identifier
    pub client_id: String,
    /// Optional operator identifier
    #[serde(default)]
    pub operator_id: String,
    /// Optional status, defaults to `open`
    #[serde(default)]
    pub status: Option<String>,
    /// Optional priority
    #[serde(default)]
    pub priority: String,
    /// Optional region
    #[serde(default)]
    pub region: String,
    /// Optional subject
    #[serde(default)]
    pub subject: String,
    /// Optional notes
    #[serde(default)]
    pub notes: String,
}

impl CreateTicket {
    /// Start a create request for the two mandatory identifiers.
    #[must_use]
    pub fn new(session_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Set the operator.
    #[must_use]
    pub fn operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = operator_id.into();
        self
    }

    /// Set the raw status.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Set the region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Check mandatory fields and the status vocabulary.
    ///
    /// An absent or empty status becomes [`TicketStatus::Open`].
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] when `session_id` or `client_id`
    /// is blank, a field is wider than its column, or the status is outside
    /// the vocabulary.
    pub fn validate(self) -> Result<NewTicket> {
        if self.session_id.trim().is_empty() {
            return Err(TicketError::invalid_input("session_id is required"));
        }
        if self.client_id.trim().is_empty() {
            return Err(TicketError::invalid_input("client_id is required"));
        }

        TicketField::Subject.check_len(&self.subject)?;
        TicketField::Priority.check_len(&self.priority)?;
        TicketField::Region.check_len(&self.region)?;

        let status = match self.status.as_deref() {
            None | Some("") => TicketStatus::Open,
            Some(raw) => TicketStatus::parse(raw)?,
        };

        Ok(NewTicket {
            session_id: self.session_id,
            client_id: self.client_id,
            operator_id: self.operator_id,
            status,
            priority: self.priority,
            region: self.region,
            subject: self.subject,
            notes: self.notes,
        })
    }
}

/// A validated ticket ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Session reference, never blank
    pub session_id: String,
    /// Client identifier, never blank
    pub client_id: String,
    /// Operator identifier
    pub operator_id: String,
    /// Initial status
    pub status: TicketStatus,
    /// Priority label
    pub priority: String,
    /// Region label
    pub region: String,
    /// Subject
    pub subject: String,
    /// Notes
    pub notes: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_parse_is_exact() {
        assert!(TicketStatus::parse("Closed").is_err());
        assert!(TicketStatus::parse("in progress").is_err());
        assert!(TicketStatus::parse("").is_err());
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn ticket_id_rejects_non_positive_values() {
        assert!(TicketId::from_request(0).is_err());
        assert!(TicketId::from_request(-3).is_err());
        assert_eq!(TicketId::from_request(7).unwrap().get(), 7);
    }

    #[test]
    fn ticket_id_parse_maps_garbage_to_invalid_id() {
        assert_eq!(
            TicketId::parse("abc"),
            Err(TicketError::invalid_input("invalid id"))
        );
        assert_eq!(
            TicketId::parse("0"),
            Err(TicketError::invalid_input("invalid id"))
        );
        assert_eq!(TicketId::parse("12").unwrap(), TicketId::new(12));
    }

    #[test]
    fn validate_defaults_status_to_open() {
        let ticket = CreateTicket::new("s1", "c1").validate().unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);

        let ticket = CreateTicket::new("s1", "c1").status("").validate().unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn validate_requires_session_and_client() {
        let err = CreateTicket::new("", "c1").validate().unwrap_err();
        assert!(matches!(err, TicketError::InvalidInput(_)));

        let err = CreateTicket::new("s1", "   ").validate().unwrap_err();
        assert!(matches!(err, TicketError::InvalidInput(_)));
    }

    #[test]
    fn validate_rejects_unknown_status() {
        let err = CreateTicket::new("s1", "c1")
            .status("pending")
            .validate()
            .unwrap_err();
        assert!(matches!(err, TicketError::InvalidInput(_)));
    }

    #[test]
    fn create_request_deserializes_with_optional_fields_missing() {
        let request: CreateTicket =
            serde_json::from_str(r#"{"session_id":"s1","client_id":"c1"}"#).unwrap();
        assert_eq!(request, CreateTicket::new("s1", "c1"));
    }
}
