//! Event sink selection.
//!
//! Exactly one transport is chosen at startup: the Kafka queue when brokers
//! and a topic are configured, otherwise the search service over HTTP when its
//! URL is set, otherwise nothing.

use crate::bootstrap::BootstrapError;
use crate::config::Config;
use std::sync::Arc;
use ticket_history_core::{EventSink, NoopEventSink};
use ticket_history_redpanda::RedpandaEventSink;
use ticket_history_runtime::NOTIFICATION_TIMEOUT;
use ticket_history_search::SearchIndexClient;

/// Build the configured sink.
///
/// # Errors
///
/// Returns [`BootstrapError::Sink`] if the chosen transport rejects its
/// configuration.
pub fn select_sink(config: &Config) -> Result<Arc<dyn EventSink>, BootstrapError> {
    if config.kafka.is_enabled() {
        let sink = RedpandaEventSink::builder()
            .broker_list(config.kafka.brokers.iter().cloned())
            .topic(config.kafka.topic.clone())
            .producer_acks(config.kafka.acks.clone())
            .compression(config.kafka.compression.clone())
            .timeout(NOTIFICATION_TIMEOUT)
            .build()
            .map_err(|e| BootstrapError::Sink(e.to_string()))?;
        tracing::info!(
            brokers = %sink.brokers(),
            topic = %sink.topic(),
            "Ticket events go to Kafka"
        );
        return Ok(Arc::new(sink));
    }

    if let Some(url) = config.search.url.as_deref() {
        let client = SearchIndexClient::with_timeout(url, NOTIFICATION_TIMEOUT)
            .map_err(|e| BootstrapError::Sink(e.to_string()))?;
        tracing::info!(endpoint = %client.endpoint(), "Ticket events go to the search service over HTTP");
        return Ok(Arc::new(client));
    }

    tracing::info!("No event sink configured, change notifications are disabled");
    Ok(Arc::new(NoopEventSink))
}
