//! In-memory implementation of the storage port.
//!
//! Mirrors the Postgres adapter's semantics: case-insensitive equality
//! filters, newest-first ordering, strictly advancing `updated_at`, and
//! `closed_at` tracking the closed status.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use ticket_history_core::environment::{Clock, SystemClock};
use ticket_history_core::repository::RepositoryFuture;
use ticket_history_core::{
    NewTicket, Page, Ticket, TicketError, TicketField, TicketFilter, TicketId, TicketPatch,
    TicketRepository,
};

#[derive(Debug, Default)]
struct Rows {
    last_id: i64,
    tickets: BTreeMap<TicketId, Ticket>,
}

/// `BTreeMap`-backed [`TicketRepository`].
///
/// Clones share the same rows, so a test can keep a handle while the service
/// owns another.
#[derive(Clone)]
pub struct InMemoryTicketRepository {
    rows: Arc<RwLock<Rows>>,
    clock: Arc<dyn Clock>,
    writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryTicketRepository {
    /// Empty repository on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty repository stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Rows::default())),
            clock,
            writes: Arc::new(AtomicUsize::new(0)),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of successful create and update calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().tickets.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent call fail with [`TicketError::Internal`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), TicketError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TicketError::internal("simulated storage outage"))
        } else {
            Ok(())
        }
    }

    fn matching(&self, filter: &TicketFilter) -> Vec<Ticket> {
        let rows = self.rows.read().unwrap();
        let mut tickets: Vec<Ticket> = rows
            .tickets
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tickets
    }
}

impl Default for InMemoryTicketRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryTicketRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTicketRepository")
            .field("tickets", &self.len())
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

fn apply_patch(ticket: &mut Ticket, patch: &TicketPatch, now: DateTime<Utc>) {
    for (field, value) in patch.text_assignments() {
        let slot = match field {
            TicketField::Subject => &mut ticket.subject,
            TicketField::Notes => &mut ticket.notes,
            TicketField::Priority => &mut ticket.priority,
            TicketField::Region => &mut ticket.region,
            TicketField::Status => continue,
        };
        *slot = value.to_string();
    }
    if let Some(status) = patch.status {
        ticket.closed_at = if status.is_closed() {
            ticket.closed_at.or(Some(now))
        } else {
            None
        };
        ticket.status = status;
    }
    ticket.updated_at = now.max(ticket.updated_at + Duration::microseconds(1));
}

impl TicketRepository for InMemoryTicketRepository {
    fn create<'a>(&'a self, ticket: &'a NewTicket) -> RepositoryFuture<'a, Ticket> {
        Box::pin(async move {
            self.check_available()?;
            let now = self.clock.now();
            let mut rows = self.rows.write().unwrap();
            rows.last_id += 1;
            let stored = Ticket {
                id: TicketId::new(rows.last_id),
                session_id: ticket.session_id.clone(),
                client_id: ticket.client_id.clone(),
                operator_id: ticket.operator_id.clone(),
                status: ticket.status,
                priority: ticket.priority.clone(),
                region: ticket.region.clone(),
                subject: ticket.subject.clone(),
                notes: ticket.notes.clone(),
                created_at: now,
                updated_at: now,
                closed_at: ticket.status.is_closed().then_some(now),
            };
            rows.tickets.insert(stored.id, stored.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(stored)
        })
    }

    fn get(&self, id: TicketId) -> RepositoryFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.rows.read().unwrap().tickets.get(&id).cloned())
        })
    }

    fn list<'a>(&'a self, filter: &'a TicketFilter, page: Page) -> RepositoryFuture<'a, Vec<Ticket>> {
        Box::pin(async move {
            self.check_available()?;
            let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
            let limit = page
                .limit
                .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
            Ok(self
                .matching(filter)
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect())
        })
    }

    fn count<'a>(&'a self, filter: &'a TicketFilter) -> RepositoryFuture<'a, u64> {
        Box::pin(async move {
            self.check_available()?;
            Ok(u64::try_from(self.matching(filter).len()).unwrap_or(u64::MAX))
        })
    }

    fn update<'a>(&'a self, id: TicketId, patch: &'a TicketPatch) -> RepositoryFuture<'a, Option<Ticket>> {
        Box::pin(async move {
            self.check_available()?;
            let now = self.clock.now();
            let mut rows = self.rows.write().unwrap();
            let Some(ticket) = rows.tickets.get_mut(&id) else {
                return Ok(None);
            };
            apply_patch(ticket, patch, now);
            let updated = ticket.clone();
            drop(rows);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(Some(updated))
        })
    }
}
