//! Ticket lifecycle rules.
//!
//! [`TicketService`] is the only place that decides which fields may change
//! and when a notification goes out. Both transports call into it.

use crate::authorization::authorize_update;
use crate::metrics::{TICKETS_CREATED_TOTAL, TICKETS_UPDATED_TOTAL};
use crate::notifier::Notifier;
use std::sync::Arc;
use ticket_history_core::{
    CreateTicket, Page, Result, Ticket, TicketChanges, TicketError, TicketEventKind, TicketFilter,
    TicketId, TicketPage, TicketRepository,
};

/// Which snapshot an update notification carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Read the row back after the write and notify with that.
    #[default]
    Refetch,
    /// Notify with the row returned by the write itself.
    Persisted,
}

/// Authorization applied to an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAccess {
    /// No caller check (REST transport).
    Unrestricted,
    /// Caller must be the ticket's client or operator (RPC transport).
    Caller(Option<String>),
}

impl UpdateAccess {
    fn authorize(&self, ticket: &Ticket) -> Result<()> {
        match self {
            Self::Unrestricted => Ok(()),
            Self::Caller(caller) => authorize_update(ticket, caller.as_deref()),
        }
    }
}

/// Create, read, list and update tickets.
#[derive(Clone)]
pub struct TicketService {
    repository: Arc<dyn TicketRepository>,
    notifier: Notifier,
    snapshot: SnapshotPolicy,
}

impl TicketService {
    /// Service over `repository`, notifying through `notifier`.
    #[must_use]
    pub fn new(repository: Arc<dyn TicketRepository>, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
            snapshot: SnapshotPolicy::default(),
        }
    }

    /// Choose the snapshot used for update notifications.
    #[must_use]
    pub const fn with_snapshot_policy(mut self, snapshot: SnapshotPolicy) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// The notifier, for draining on shutdown.
    #[must_use]
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Validate and persist a new ticket, then notify `ticket.created`.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidInput`] for blank identifiers or an unknown status
    /// - [`TicketError::Internal`] when storage fails
    #[tracing::instrument(skip_all, fields(client_id = %request.client_id))]
    pub async fn create(&self, request: CreateTicket) -> Result<Ticket> {
        let new_ticket = request.validate()?;
        let ticket = self.repository.create(&new_ticket).await?;

        tracing::info!(ticket_id = %ticket.id, status = %ticket.status, "Ticket created");
        metrics::counter!(TICKETS_CREATED_TOTAL).increment(1);
        self.notifier.dispatch(TicketEventKind::Created, &ticket);
        Ok(ticket)
    }

    /// Fetch one ticket.
    ///
    /// # Errors
    ///
    /// - [`TicketError::NotFound`] when no ticket has this id
    /// - [`TicketError::Internal`] when storage fails
    #[tracing::instrument(skip(self), fields(ticket_id = %id))]
    pub async fn get(&self, id: TicketId) -> Result<Ticket> {
        self.repository
            .get(id)
            .await?
            .ok_or(TicketError::NotFound(id))
    }

    /// One page of matching tickets plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Internal`] when storage fails.
    #[tracing::instrument(skip(self, filter), fields(predicates = filter.predicates().len()))]
    pub async fn list(&self, filter: &TicketFilter, page: Page) -> Result<TicketPage> {
        let total = self.repository.count(filter).await?;
        let tickets = self.repository.list(filter, page).await?;
        Ok(TicketPage { tickets, total })
    }

    /// Every ticket, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Internal`] when storage fails.
    pub async fn all(&self) -> Result<Vec<Ticket>> {
        self.repository.list(&TicketFilter::new(), Page::all()).await
    }

    /// Apply whitelisted changes to a ticket, then notify `ticket.updated`.
    ///
    /// Order: load, authorize, whitelist, validate, persist, re-fetch,
    /// notify. Nothing is written unless every check passes. Once the write
    /// returns, the re-fetch and notification run in their own task, so a
    /// caller that goes away after the write cannot suppress the notification.
    ///
    /// # Errors
    ///
    /// - [`TicketError::NotFound`] when no ticket has this id
    /// - [`TicketError::PermissionDenied`] when `access` rejects the caller
    /// - [`TicketError::InvalidInput`] for an empty effective change set or an
    ///   unknown status
    /// - [`TicketError::Internal`] when storage fails
    #[tracing::instrument(skip(self, changes, access), fields(ticket_id = %id))]
    pub async fn update(&self, id: TicketId, changes: TicketChanges, access: &UpdateAccess) -> Result<Ticket> {
        let current = self.get(id).await?;
        access.authorize(&current)?;
        let patch = changes.into_patch()?;

        let persisted = self
            .repository
            .update(id, &patch)
            .await?
            .ok_or(TicketError::NotFound(id))?;
        metrics::counter!(TICKETS_UPDATED_TOTAL).increment(1);

        let completion = tokio::spawn(complete_update(
            Arc::clone(&self.repository),
            self.notifier.clone(),
            self.snapshot,
            persisted,
        ));
        completion
            .await
            .map_err(|e| TicketError::internal(format!("update completion task failed: {e}")))
    }
}

impl std::fmt::Debug for TicketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketService")
            .field("notifier", &self.notifier)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

async fn complete_update(
    repository: Arc<dyn TicketRepository>,
    notifier: Notifier,
    policy: SnapshotPolicy,
    persisted: Ticket,
) -> Ticket {
    let snapshot = match policy {
        SnapshotPolicy::Persisted => persisted,
        SnapshotPolicy::Refetch => match repository.get(persisted.id).await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                tracing::warn!(ticket_id = %persisted.id, "Ticket missing on re-fetch, using persisted snapshot");
                persisted
            }
            Err(error) => {
                tracing::warn!(ticket_id = %persisted.id, error = %error, "Re-fetch failed, using persisted snapshot");
                persisted
            }
        },
    };

    tracing::info!(ticket_id = %snapshot.id, status = %snapshot.status, "Ticket updated");
    notifier.dispatch(TicketEventKind::Updated, &snapshot);
    snapshot
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use ticket_history_core::{FilterColumn, TicketStatus};
    use ticket_history_core::environment::Clock;
    use ticket_history_testing::{
        FailingEventSink, InMemoryTicketRepository, RecordingEventSink, StalledEventSink,
        SteppingClock, test_clock,
    };

    fn repository() -> InMemoryTicketRepository {
        InMemoryTicketRepository::with_clock(Arc::new(SteppingClock::new(
            test_clock().now(),
            ChronoDuration::seconds(1),
        )))
    }

    fn service_with(repository: &InMemoryTicketRepository, sink: &RecordingEventSink) -> TicketService {
        TicketService::new(
            Arc::new(repository.clone()),
            Notifier::new(Arc::new(sink.clone())),
        )
    }

    #[tokio::test]
    async fn scenario_create_get_close() {
        let repo = repository();
        let sink = RecordingEventSink::new();
        let service = service_with(&repo, &sink);

        let created = service.create(CreateTicket::new("s1", "c1")).await.unwrap();
        assert_eq!(created.status, TicketStatus::Open);

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched, created);

        service
            .update(
                created.id,
                TicketChanges::new().set("status", "closed"),
                &UpdateAccess::Unrestricted,
            )
            .await
            .unwrap();

        let closed = service.get(created.id).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert!(closed.updated_at > closed.created_at);
        assert_eq!(closed.created_at, created.created_at);

        let events = sink.wait_for(2, Duration::from_secs(2)).await.expect("two notifications");
        assert_eq!(events[0].event, TicketEventKind::Created);
        assert_eq!(events[1].event, TicketEventKind::Updated);
        assert_eq!(events[1].status, TicketStatus::Closed);
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let repo = repository();
        let sink = RecordingEventSink::new();
        let service = service_with(&repo, &sink);

        for request in [
            CreateTicket::new("", "c1"),
            CreateTicket::new("s1", ""),
            CreateTicket::new("s1", "c1").status("waiting"),
        ] {
            let err = service.create(request).await.unwrap_err();
            assert!(matches!(err, TicketError::InvalidInput(_)));
        }
        assert!(repo.is_empty());
        assert_eq!(service.notifier().in_flight(), 0);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn update_with_only_unknown_keys_writes_nothing() {
        let repo = repository();
        let sink = RecordingEventSink::new();
        let service = service_with(&repo, &sink);
        let ticket = service.create(CreateTicket::new("s1", "c1")).await.unwrap();

        let err = service
            .update(
                ticket.id,
                TicketChanges::new().set("client_id", "c2").set("session_id", "s2"),
                &UpdateAccess::Unrestricted,
            )
            .await
            .unwrap_err();

        assert_eq!(err, TicketError::invalid_input("no changes provided"));
        assert_eq!(repo.write_count(), 1);
        assert_eq!(service.get(ticket.id).await.unwrap(), ticket);
    }

    #[tokio::test]
    async fn unknown_status_blocks_the_whole_update() {
        let repo = repository();
        let service = service_with(&repo, &RecordingEventSink::new());
        let ticket = service.create(CreateTicket::new("s1", "c1")).await.unwrap();

        let err = service
            .update(
                ticket.id,
                TicketChanges::new().set("subject", "new").set("status", "done"),
                &UpdateAccess::Unrestricted,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TicketError::InvalidInput(_)));
        assert_eq!(service.get(ticket.id).await.unwrap().subject, "");
        assert_eq!(repo.write_count(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_ticket_is_not_found() {
        let service = service_with(&repository(), &RecordingEventSink::new());
        let err = service
            .update(
                TicketId::new(404),
                TicketChanges::new().set("notes", "x"),
                &UpdateAccess::Unrestricted,
            )
            .await
            .unwrap_err();
        assert_eq!(err, TicketError::NotFound(TicketId::new(404)));
    }

    #[tokio::test]
    async fn update_is_idempotent_in_content() {
        let repo = repository();
        let service = service_with(&repo, &RecordingEventSink::new());
        let ticket = service.create(CreateTicket::new("s1", "c1")).await.unwrap();
        let changes = TicketChanges::new()
            .set("priority", "high")
            .set("region", "eu")
            .set("status", "in_progress");

        let first = service
            .update(ticket.id, changes.clone(), &UpdateAccess::Unrestricted)
            .await
            .unwrap();
        let second = service
            .update(ticket.id, changes, &UpdateAccess::Unrestricted)
            .await
            .unwrap();

        assert_eq!(
            (&first.priority, &first.region, first.status),
            (&second.priority, &second.region, second.status)
        );
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn caller_access_is_checked_before_the_change_set() {
        let repo = repository();
        let service = service_with(&repo, &RecordingEventSink::new());
        let ticket = service
            .create(CreateTicket::new("s1", "c1").operator("op1"))
            .await
            .unwrap();

        // An empty change set from a stranger is a permission error, not a
        // validation error.
        let err = service
            .update(ticket.id, TicketChanges::new(), &UpdateAccess::Caller(Some("eve".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::PermissionDenied(_)));

        let err = service
            .update(ticket.id, TicketChanges::new().set("notes", "x"), &UpdateAccess::Caller(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::PermissionDenied(_)));

        for caller in ["c1", "op1"] {
            service
                .update(
                    ticket.id,
                    TicketChanges::new().set("notes", caller),
                    &UpdateAccess::Caller(Some(caller.into())),
                )
                .await
                .unwrap();
        }
        assert_eq!(service.get(ticket.id).await.unwrap().notes, "op1");
    }

    #[tokio::test]
    async fn list_reports_total_before_pagination() {
        let repo = repository();
        let service = service_with(&repo, &RecordingEventSink::new());
        for region in ["eu", "eu", "eu", "us"] {
            service
                .create(CreateTicket::new("s1", "c1").region(region))
                .await
                .unwrap();
        }

        let filter = TicketFilter::from_pairs([("region", "eu"), ("notes", "ignored")]);
        let page = service.list(&filter, Page::new(2, 0)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.tickets.len(), 2);

        let unlimited = service.list(&filter, Page::new(0, -1)).await.unwrap();
        assert_eq!(unlimited.tickets.len(), 3);

        let with_noise = TicketFilter::from_pairs([("region", "eu"), ("subject", "x"), ("id", "1")]);
        assert_eq!(service.list(&with_noise, Page::all()).await.unwrap(), unlimited);
    }

    #[tokio::test]
    async fn list_filters_case_insensitively() {
        let service = service_with(&repository(), &RecordingEventSink::new());
        service
            .create(CreateTicket::new("s1", "Client-A"))
            .await
            .unwrap();
        let filter = TicketFilter::new().with(FilterColumn::ClientId, "client-a");
        assert_eq!(service.list(&filter, Page::all()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn failing_sink_does_not_change_the_outcome() {
        let repo = repository();
        let sink = FailingEventSink::new();
        let service = TicketService::new(Arc::new(repo.clone()), Notifier::new(Arc::new(sink.clone())));

        let ticket = service.create(CreateTicket::new("s1", "c1")).await.unwrap();
        let updated = service
            .update(ticket.id, TicketChanges::new().set("notes", "n"), &UpdateAccess::Unrestricted)
            .await
            .unwrap();
        assert_eq!(updated.notes, "n");

        assert!(service.notifier().wait_idle(Duration::from_secs(2)).await);
        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test]
    async fn stalled_sink_does_not_delay_the_caller() {
        let repo = repository();
        let service = TicketService::new(
            Arc::new(repo.clone()),
            Notifier::new(Arc::new(StalledEventSink::new())),
        );

        let ticket = tokio::time::timeout(
            Duration::from_secs(1),
            service.create(CreateTicket::new("s1", "c1")),
        )
        .await
        .expect("create returns while the sink hangs")
        .unwrap();

        tokio::time::timeout(
            Duration::from_secs(1),
            service.update(ticket.id, TicketChanges::new().set("notes", "n"), &UpdateAccess::Unrestricted),
        )
        .await
        .expect("update returns while the sink hangs")
        .unwrap();

        assert_eq!(service.notifier().in_flight(), 2);
    }

    #[tokio::test]
    async fn persisted_policy_skips_the_re_fetch() {
        let repo = repository();
        let sink = RecordingEventSink::new();
        let service = service_with(&repo, &sink).with_snapshot_policy(SnapshotPolicy::Persisted);
        let ticket = service.create(CreateTicket::new("s1", "c1")).await.unwrap();

        let updated = service
            .update(ticket.id, TicketChanges::new().set("subject", "s"), &UpdateAccess::Unrestricted)
            .await
            .unwrap();

        let events = sink.wait_for(2, Duration::from_secs(2)).await.unwrap();
        assert_eq!(events[1].subject, updated.subject);
    }

    #[tokio::test]
    async fn storage_failure_is_internal() {
        let repo = repository();
        let service = service_with(&repo, &RecordingEventSink::new());
        repo.set_unavailable(true);

        let err = service.list(&TicketFilter::new(), Page::all()).await.unwrap_err();
        assert!(matches!(err, TicketError::Internal(_)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use ticket_history_testing::strategies::valid_create_ticket;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn create_then_get_round_trips(request in valid_create_ticket()) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let service = service_with(&repository(), &RecordingEventSink::new());

                let (created, fetched) = runtime.block_on(async {
                    let created = service.create(request.clone()).await.unwrap();
                    let fetched = service.get(created.id).await.unwrap();
                    (created, fetched)
                });

                prop_assert_eq!(&created, &fetched);
                prop_assert_eq!(&fetched.session_id, &request.session_id);
                prop_assert_eq!(&fetched.client_id, &request.client_id);
                prop_assert_eq!(&fetched.operator_id, &request.operator_id);
                prop_assert_eq!(&fetched.subject, &request.subject);
                prop_assert_eq!(&fetched.notes, &request.notes);
                prop_assert_eq!(&fetched.priority, &request.priority);
                prop_assert_eq!(&fetched.region, &request.region);
                prop_assert!(fetched.id.get() > 0);
                prop_assert_eq!(fetched.created_at, fetched.updated_at);
            }
        }
    }
}
