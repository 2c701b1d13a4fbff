//! Who may update a ticket over RPC.
//!
//! The caller presents an identity in request metadata. The update is allowed
//! only when that identity equals the ticket's client or its assigned
//! operator. The check runs against a fresh read of the ticket, before the
//! change set is looked at.

use ticket_history_core::{Result, Ticket, TicketError};

/// Metadata key carrying the caller identity.
pub const CALLER_ID_METADATA: &str = "x-caller-id";

/// Check `caller` against the ticket's client and operator.
///
/// The identity is trimmed; an empty identity counts as absent. An unassigned
/// operator (empty string) never matches.
///
/// # Errors
///
/// Returns [`TicketError::PermissionDenied`] when the identity is absent or
/// matches neither party.
pub fn authorize_update(ticket: &Ticket, caller: Option<&str>) -> Result<()> {
    let Some(caller) = caller.map(str::trim).filter(|c| !c.is_empty()) else {
        return Err(TicketError::permission_denied(format!(
            "caller identity required ({CALLER_ID_METADATA})"
        )));
    };

    if caller == ticket.client_id || (!ticket.operator_id.is_empty() && caller == ticket.operator_id) {
        Ok(())
    } else {
        tracing::info!(
            ticket_id = %ticket.id,
            caller = %caller,
            "Update rejected: caller is neither client nor operator"
        );
        Err(TicketError::permission_denied(
            "caller is not the ticket client or assigned operator",
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ticket_history_core::{TicketId, TicketStatus};

    fn ticket(client: &str, operator: &str) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(1),
            session_id: "s1".into(),
            client_id: client.into(),
            operator_id: operator.into(),
            status: TicketStatus::Open,
            priority: String::new(),
            region: String::new(),
            subject: String::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    #[test]
    fn client_and_operator_may_update() {
        let t = ticket("c1", "op1");
        assert!(authorize_update(&t, Some("c1")).is_ok());
        assert!(authorize_update(&t, Some("op1")).is_ok());
        assert!(authorize_update(&t, Some("  op1 ")).is_ok());
    }

    #[test]
    fn strangers_are_denied() {
        let err = authorize_update(&ticket("c1", "op1"), Some("mallory")).unwrap_err();
        assert_eq!(
            err,
            TicketError::permission_denied("caller is not the ticket client or assigned operator")
        );
    }

    #[test]
    fn missing_identity_is_denied() {
        let t = ticket("c1", "");
        for caller in [None, Some(""), Some("   ")] {
            let err = authorize_update(&t, caller).unwrap_err();
            assert_eq!(
                err,
                TicketError::permission_denied("caller identity required (x-caller-id)")
            );
        }
    }

    #[test]
    fn unassigned_operator_matches_nobody() {
        let err = authorize_update(&ticket("c1", ""), Some("op1")).unwrap_err();
        assert!(matches!(err, TicketError::PermissionDenied(_)));
    }
}
