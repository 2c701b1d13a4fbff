//! HTTP push client for the search indexing service.
//!
//! [`SearchIndexClient`] implements the [`EventSink`] port by POSTing each
//! [`TicketEvent`] as JSON to `{base_url}/search/index/ticket`. Any non-2xx
//! answer is a failed delivery; the body is kept (truncated) for the log.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use ticket_history_core::{DeliveryFuture, EventSink, SinkError, TicketEvent};

/// Path appended to the configured base URL.
pub const INDEX_PATH: &str = "/search/index/ticket";

/// Per-request timeout applied by the HTTP client itself.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ERROR_BODY: usize = 512;

/// Errors raised while building the client.
#[derive(Error, Debug)]
pub enum SearchClientError {
    /// The base URL is blank
    #[error("Search service URL not configured")]
    MissingUrl,

    /// reqwest could not build a client
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// Search indexing client.
#[derive(Clone, Debug)]
pub struct SearchIndexClient {
    client: Client,
    endpoint: String,
}

impl SearchIndexClient {
    /// Create a client for the service at `base_url`.
    ///
    /// A trailing slash on `base_url` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SearchClientError`] if the URL is blank or the client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, SearchClientError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SearchClientError`] if the URL is blank or the client
    /// cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, SearchClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SearchClientError::MissingUrl);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{base_url}{INDEX_PATH}"),
        })
    }

    /// Full URL notifications are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Transport`] for network failures and
    /// [`SinkError::Rejected`] for non-2xx answers.
    pub async fn index(&self, event: &TicketEvent) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                ticket_id = %event.ticket_id,
                status = status.as_u16(),
                "Search index accepted notification"
            );
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl EventSink for SearchIndexClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn deliver(&self, event: &TicketEvent) -> DeliveryFuture<'_> {
        let event = event.clone();
        Box::pin(async move { self.index(&event).await })
    }
}
