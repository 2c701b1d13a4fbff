//! Storage port for tickets.
//!
//! The service holds an `Arc<dyn TicketRepository>`; it never knows which
//! database sits behind it. Adapters are the only writers of persisted state
//! and translate their own failures into [`TicketError::Internal`].
//!
//! [`TicketError::Internal`]: crate::error::TicketError::Internal

use crate::changes::TicketPatch;
use crate::error::Result;
use crate::filter::{Page, TicketFilter};
use crate::ticket::{NewTicket, Ticket, TicketId};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by repository operations.
pub type RepositoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistence operations on the `tickets` table.
///
/// Adapters assign identifiers and timestamps. An update must:
///
/// - apply every `Some` field of the patch and nothing else
/// - advance `updated_at` strictly past its previous value
/// - set `closed_at` when the status becomes `closed` (keeping an existing
///   value) and clear it when the status leaves `closed`
pub trait TicketRepository: Send + Sync {
    /// Insert a ticket and return the stored row.
    fn create<'a>(&'a self, ticket: &'a NewTicket) -> RepositoryFuture<'a, Ticket>;

    /// Point lookup. `Ok(None)` when no row matches.
    fn get(&self, id: TicketId) -> RepositoryFuture<'_, Option<Ticket>>;

    /// Matching tickets, newest first (ties broken by id, descending).
    fn list<'a>(&'a self, filter: &'a TicketFilter, page: Page) -> RepositoryFuture<'a, Vec<Ticket>>;

    /// Number of matching tickets, ignoring pagination.
    fn count<'a>(&'a self, filter: &'a TicketFilter) -> RepositoryFuture<'a, u64>;

    /// Apply a patch and return the stored row. `Ok(None)` when no row matches.
    fn update<'a>(&'a self, id: TicketId, patch: &'a TicketPatch) -> RepositoryFuture<'a, Option<Ticket>>;
}
