//! Custom Axum extractors.
//!
//! Both extractors reject with an [`AppError`] so malformed requests get the
//! same JSON error body as every other failure:
//!
//! - [`ApiJson`]: a JSON body, `400 invalid body` when it does not parse
//! - [`TicketIdPath`]: the `{id}` path segment, `400 invalid id` unless it is
//!   a positive integer

use crate::error::AppError;
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use ticket_history_core::TicketId;

/// JSON body extractor with a uniform rejection.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(AppError::bad_request("invalid body"))
            },
        }
    }
}

/// Ticket id taken from the request path.
#[derive(Debug, Clone, Copy)]
pub struct TicketIdPath(pub TicketId);

#[async_trait]
impl<S> FromRequestParts<S> for TicketIdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::bad_request("invalid id"))?;
        Ok(Self(TicketId::parse(&raw)?))
    }
}
