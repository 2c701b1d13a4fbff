//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use ticket_history_core::ReadinessProbe;
use ticket_history_runtime::TicketService;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<TicketService>,
    probes: Arc<Vec<Arc<dyn ReadinessProbe>>>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State over `service` with no probes and no metrics endpoint.
    #[must_use]
    pub fn new(service: Arc<TicketService>) -> Self {
        Self {
            service,
            probes: Arc::new(Vec::new()),
            metrics: None,
        }
    }

    /// Register a readiness probe for `/ready`.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        Arc::make_mut(&mut self.probes).push(probe);
        self
    }

    /// Serve `/metrics` from this recorder handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The ticket service.
    #[must_use]
    pub fn service(&self) -> &TicketService {
        &self.service
    }

    /// Registered readiness probes.
    #[must_use]
    pub fn probes(&self) -> &[Arc<dyn ReadinessProbe>] {
        &self.probes
    }

    /// Prometheus handle, if a recorder is installed.
    #[must_use]
    pub const fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("probes", &self.probes.len())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
