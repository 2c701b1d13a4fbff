//! Full re-indexing of the search service.

use ticket_history_core::TicketEventKind;
use ticket_history_runtime::{DeliveryOutcome, TicketService};

/// Tickets between two progress log lines.
pub const PROGRESS_EVERY: usize = 50;

/// Result of a re-index run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    /// Tickets loaded from storage
    pub total: usize,
    /// Notifications the sink acknowledged
    pub delivered: usize,
    /// Notifications that failed or timed out
    pub failed: usize,
    /// Notifications skipped because no sink is configured
    pub skipped: usize,
}

/// Push a `ticket.updated` notification for every stored ticket.
///
/// Deliveries run one at a time, each bounded by the notifier's budget, so the
/// sink sees back-pressure instead of a burst. Individual failures are counted
/// and do not stop the run. With no sink configured nothing is sent.
///
/// # Errors
///
/// Returns the storage error if the tickets cannot be loaded.
pub async fn reindex(service: &TicketService) -> ticket_history_core::Result<ReindexSummary> {
    let tickets = service.all().await?;
    let notifier = service.notifier();
    let mut summary = ReindexSummary {
        total: tickets.len(),
        ..ReindexSummary::default()
    };
    tracing::info!(total = summary.total, sink = notifier.sink_name(), "Reindexing tickets");

    if !notifier.is_enabled() {
        tracing::warn!(
            total = summary.total,
            "Neither KAFKA_BROKERS/KAFKA_TOPIC_TICKET nor SEARCH_SERVICE_URL is set, nothing reindexed"
        );
        summary.skipped = summary.total;
        return Ok(summary);
    }

    for (index, ticket) in tickets.iter().enumerate() {
        match notifier.deliver_now(TicketEventKind::Updated, ticket).await {
            DeliveryOutcome::Delivered => summary.delivered += 1,
            DeliveryOutcome::Failed | DeliveryOutcome::TimedOut => summary.failed += 1,
            DeliveryOutcome::Skipped => summary.skipped += 1,
        }
        let sent = index + 1;
        if sent % PROGRESS_EVERY == 0 || sent == summary.total {
            tracing::info!(sent, total = summary.total, "Reindex progress");
        }
    }

    tracing::info!(
        delivered = summary.delivered,
        failed = summary.failed,
        "Reindex complete"
    );
    Ok(summary)
}
