//! `TicketError` to `tonic::Status`.

use tonic::Status;
use ticket_history_core::TicketError;

/// Message returned for every internal failure.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Map a service error to a gRPC status.
///
/// Internal detail is logged here and replaced with [`INTERNAL_MESSAGE`].
#[must_use]
pub fn to_status(error: TicketError) -> Status {
    match error {
        TicketError::InvalidInput(message) => Status::invalid_argument(message),
        TicketError::NotFound(id) => Status::not_found(format!("ticket with id {id} not found")),
        TicketError::PermissionDenied(message) => Status::permission_denied(message),
        TicketError::Internal(detail) => {
            tracing::error!(error = %detail, "gRPC request failed");
            Status::internal(INTERNAL_MESSAGE)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_history_core::TicketId;
    use tonic::Code;

    #[test]
    fn kinds_map_to_codes() {
        let cases = [
            (TicketError::invalid_input("no changes provided"), Code::InvalidArgument),
            (TicketError::NotFound(TicketId::new(4)), Code::NotFound),
            (TicketError::permission_denied("nope"), Code::PermissionDenied),
            (TicketError::internal("pool timed out"), Code::Internal),
        ];
        for (error, code) in cases {
            assert_eq!(to_status(error).code(), code);
        }
    }

    #[test]
    fn caller_messages_survive() {
        let status = to_status(TicketError::invalid_input("no changes provided"));
        assert_eq!(status.message(), "no changes provided");

        let status = to_status(TicketError::NotFound(TicketId::new(4)));
        assert_eq!(status.message(), "ticket with id 4 not found");
    }

    #[test]
    fn internal_detail_is_hidden() {
        let status = to_status(TicketError::internal("connection refused on 10.0.0.3"));
        assert_eq!(status.message(), INTERNAL_MESSAGE);
    }
}
