//! Kafka-compatible change-notification sink for the ticket history service.
//!
//! [`RedpandaEventSink`] implements the [`EventSink`] port from
//! `ticket-history-core` with an rdkafka `FutureProducer`. Any
//! Kafka-protocol broker works: Redpanda, Apache Kafka, MSK.
//!
//! # Delivery Semantics
//!
//! **At-most-once per call**: the sink produces one record and reports the
//! broker's answer. It never retries on its own; the notifier in the runtime
//! crate bounds the call and swallows failures.
//!
//! - Payload: the JSON [`TicketEvent`]
//! - Key: the ticket id, so notifications for one ticket land on one partition
//!   and stay ordered
//!
//! # Example
//!
//! ```no_run
//! use ticket_history_redpanda::RedpandaEventSink;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = RedpandaEventSink::builder()
//!     .brokers("localhost:9092,localhost:9093")
//!     .topic("ticket-events")
//!     .producer_acks("all")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use thiserror::Error;
use ticket_history_core::{DeliveryFuture, EventSink, SinkError, TicketEvent};

/// Producer send timeout used when none is configured.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while building the producer.
#[derive(Error, Debug)]
pub enum RedpandaError {
    /// No broker address was supplied
    #[error("Brokers not configured")]
    MissingBrokers,

    /// No topic was supplied
    #[error("Topic not configured")]
    MissingTopic,

    /// rdkafka rejected the configuration
    #[error("Failed to create producer: {0}")]
    Producer(String),
}

/// Split a comma-separated broker list, trimming entries and dropping blanks.
///
/// ```
/// use ticket_history_redpanda::parse_brokers;
///
/// assert_eq!(parse_brokers(" a:9092, ,b:9092 "), vec!["a:9092", "b:9092"]);
/// assert!(parse_brokers(" , ").is_empty());
/// ```
#[must_use]
pub fn parse_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

/// Publishes ticket notifications to a single topic.
pub struct RedpandaEventSink {
    producer: FutureProducer,
    topic: String,
    brokers: String,
    timeout: Duration,
}

impl RedpandaEventSink {
    /// Create a new builder for configuring the sink.
    #[must_use]
    pub fn builder() -> RedpandaEventSinkBuilder {
        RedpandaEventSinkBuilder::default()
    }

    /// Topic notifications are produced to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Bootstrap servers, comma separated.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

impl std::fmt::Debug for RedpandaEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedpandaEventSink")
            .field("topic", &self.topic)
            .field("brokers", &self.brokers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`RedpandaEventSink`].
#[derive(Debug, Default)]
pub struct RedpandaEventSinkBuilder {
    brokers: Vec<String>,
    topic: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaEventSinkBuilder {
    /// Set the broker addresses from a comma-separated list.
    #[must_use]
    pub fn brokers(mut self, brokers: &str) -> Self {
        self.brokers = parse_brokers(brokers);
        self
    }

    /// Set the broker addresses from a list.
    #[must_use]
    pub fn broker_list(mut self, brokers: impl IntoIterator<Item = String>) -> Self {
        self.brokers = brokers
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        self
    }

    /// Set the target topic.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1" or "all".
    ///
    /// Default: "1"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec: "none", "gzip", "snappy", "lz4", "zstd".
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`RedpandaEventSink`].
    ///
    /// rdkafka connects lazily, so an unreachable broker is not an error here;
    /// it surfaces as a failed delivery.
    ///
    /// # Errors
    ///
    /// Returns [`RedpandaError`] if brokers or topic are missing or the
    /// producer configuration is rejected.
    pub fn build(self) -> Result<RedpandaEventSink, RedpandaError> {
        if self.brokers.is_empty() {
            return Err(RedpandaError::MissingBrokers);
        }
        let topic = self
            .topic
            .filter(|t| !t.trim().is_empty())
            .ok_or(RedpandaError::MissingTopic)?;
        let brokers = self.brokers.join(",");
        let timeout = self.timeout.unwrap_or(DEFAULT_SEND_TIMEOUT);
        let acks = self.producer_acks.as_deref().unwrap_or("1");
        let compression = self.compression.as_deref().unwrap_or("none");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| RedpandaError::Producer(e.to_string()))?;

        tracing::info!(
            brokers = %brokers,
            topic = %topic,
            acks,
            compression,
            "RedpandaEventSink created successfully"
        );

        Ok(RedpandaEventSink {
            producer,
            topic,
            brokers,
            timeout,
        })
    }
}

impl EventSink for RedpandaEventSink {
    fn name(&self) -> &'static str {
        "kafka"
    }

    fn deliver(&self, event: &TicketEvent) -> DeliveryFuture<'_> {
        // Encode before moving into the async block
        let payload = event.to_json();
        let key = event.key();

        Box::pin(async move {
            let payload = payload.map_err(|e| SinkError::Serialization(e.to_string()))?;
            let record = FutureRecord::to(&self.topic).payload(&payload).key(&key);

            match self.producer.send(record, Timeout::After(self.timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %self.topic,
                        partition,
                        offset,
                        key = %key,
                        "Ticket notification produced"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => Err(SinkError::Transport(kafka_error.to_string())),
            }
        })
    }
}
