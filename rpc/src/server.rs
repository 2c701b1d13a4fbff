//! `TicketService` gRPC handlers.

use crate::convert::{list_query, update_changes};
use crate::proto::{
    self, CreateTicketRequest, GetTicketRequest, ListTicketsRequest, ListTicketsResponse,
    UpdateTicketRequest,
    ticket_service_server::{TicketService as TicketServiceRpc, TicketServiceServer},
};
use crate::status::to_status;
use std::sync::Arc;
use ticket_history_core::{CreateTicket, TicketId};
use ticket_history_runtime::{CALLER_ID_METADATA, TicketService, UpdateAccess};
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

/// gRPC front end over a shared [`TicketService`].
#[derive(Debug, Clone)]
pub struct TicketGrpcService {
    service: Arc<TicketService>,
}

impl TicketGrpcService {
    /// Wrap the ticket service.
    #[must_use]
    pub const fn new(service: Arc<TicketService>) -> Self {
        Self { service }
    }

    /// The tonic server for this handler set.
    #[must_use]
    pub fn into_server(self) -> TicketServiceServer<Self> {
        TicketServiceServer::new(self)
    }
}

/// The trimmed caller identity, if the metadata carries a usable one.
fn caller_id(metadata: &MetadataMap) -> Option<String> {
    metadata
        .get(CALLER_ID_METADATA)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|caller| !caller.is_empty())
        .map(str::to_owned)
}

#[tonic::async_trait]
impl TicketServiceRpc for TicketGrpcService {
    async fn create_ticket(
        &self,
        request: Request<CreateTicketRequest>,
    ) -> Result<Response<proto::Ticket>, Status> {
        let create = CreateTicket::from(request.into_inner());
        let ticket = self.service.create(create).await.map_err(to_status)?;
        Ok(Response::new(ticket.into()))
    }

    async fn get_ticket(
        &self,
        request: Request<GetTicketRequest>,
    ) -> Result<Response<proto::Ticket>, Status> {
        let id = TicketId::from_request(request.get_ref().id).map_err(to_status)?;
        let ticket = self.service.get(id).await.map_err(to_status)?;
        Ok(Response::new(ticket.into()))
    }

    async fn list_tickets(
        &self,
        request: Request<ListTicketsRequest>,
    ) -> Result<Response<ListTicketsResponse>, Status> {
        let (filter, page) = list_query(request.get_ref());
        let result = self.service.list(&filter, page).await.map_err(to_status)?;
        Ok(Response::new(ListTicketsResponse {
            tickets: result.tickets.into_iter().map(Into::into).collect(),
            total: i64::try_from(result.total).unwrap_or(i64::MAX),
        }))
    }

    async fn update_ticket(
        &self,
        request: Request<UpdateTicketRequest>,
    ) -> Result<Response<proto::Ticket>, Status> {
        let access = UpdateAccess::Caller(caller_id(request.metadata()));
        let body = request.into_inner();
        let id = TicketId::from_request(body.id).map_err(to_status)?;

        tracing::debug!(ticket_id = %id, "gRPC update requested");
        let ticket = self
            .service
            .update(id, update_changes(body), &access)
            .await
            .map_err(to_status)?;
        Ok(Response::new(ticket.into()))
    }
}
