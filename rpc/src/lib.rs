//! # Ticket History RPC
//!
//! tonic implementation of `ticket_history.v1.TicketService`.
//!
//! The four methods mirror the REST surface. `UpdateTicket` additionally
//! requires the caller identity in the `x-caller-id` metadata entry and only
//! proceeds for the ticket's client or assigned operator.
//!
//! ```ignore
//! use ticket_history_rpc::TicketGrpcService;
//!
//! tonic::transport::Server::builder()
//!     .add_service(TicketGrpcService::new(service).into_server())
//!     .serve(addr)
//!     .await?;
//! ```

pub mod convert;
pub mod server;
pub mod status;

/// Generated protobuf messages and service traits.
#[allow(missing_docs, clippy::pedantic, clippy::all)]
pub mod proto {
    tonic::include_proto!("ticket_history.v1");
}

pub use proto::ticket_service_server::TicketServiceServer;
pub use server::TicketGrpcService;
pub use status::to_status;
