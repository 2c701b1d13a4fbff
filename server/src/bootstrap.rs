//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: connect the pool, apply migrations, pick the event sink,
//!    bind both listeners
//! 2. **Runtime**: serve REST and gRPC from the same [`TicketService`]
//! 3. **Shutdown**: on Ctrl+C or SIGTERM both listeners stop accepting,
//!    in-flight notifications get the configured grace period, the pool is
//!    closed
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let app = Application::build(config, metrics).await?;
//! app.run().await?;
//! ```

use crate::config::Config;
use crate::sinks::select_sink;
use axum::Router;
use sqlx::PgPool;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use ticket_history_postgres::{PostgresTicketRepository, StorageError};
use ticket_history_rpc::TicketGrpcService;
use ticket_history_runtime::metrics::MetricsError;
use ticket_history_runtime::{Notifier, TicketService};
use ticket_history_web::{AppState, router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,ticket_history=debug,sqlx=warn,tower_http=info";

/// Errors raised while starting or running the service.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Database setup failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The event sink rejected its configuration
    #[error("Failed to configure event sink: {0}")]
    Sink(String),

    /// Metrics exporter could not be installed
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// The tracing subscriber could not be installed
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),

    /// A listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The HTTP server failed
    #[error("HTTP server error: {0}")]
    Http(#[source] io::Error),

    /// The gRPC server failed
    #[error("gRPC server error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// A storage query outside the request path failed
    #[error("Database error: {0}")]
    Database(String),
}

/// Install the global tracing subscriber: `RUST_LOG` (or
/// [`DEFAULT_LOG_FILTER`]) plus the fmt layer.
///
/// # Errors
///
/// Returns [`BootstrapError::Tracing`] if a subscriber is already installed.
pub fn init_tracing() -> Result<(), BootstrapError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| BootstrapError::Tracing(e.to_string()))
}

/// Connect the pool described by `config`, creating the database if missing.
///
/// # Errors
///
/// Returns [`BootstrapError::Storage`] if the database cannot be created or
/// reached.
pub async fn connect_database(config: &Config) -> Result<PgPool, BootstrapError> {
    let url = config.database.url();
    if ticket_history_postgres::ensure_database(&url).await? {
        info!(database = %config.database.database, "Database created");
    }
    let pool = ticket_history_postgres::connect(&url, &config.database.pool_settings()).await?;
    info!(
        max_connections = config.database.max_connections,
        "Database pool connected"
    );
    Ok(pool)
}

/// Ticket service over `pool` notifying through the configured sink.
///
/// # Errors
///
/// Returns [`BootstrapError::Sink`] if the sink cannot be built.
pub fn build_service(config: &Config, pool: PgPool) -> Result<TicketService, BootstrapError> {
    let sink = select_sink(config)?;
    let repository = Arc::new(PostgresTicketRepository::new(pool));
    Ok(TicketService::new(repository, Notifier::new(sink))
        .with_snapshot_policy(config.notifications.snapshot_policy()))
}

/// Fully wired service with both listeners bound.
pub struct Application {
    config: Config,
    pool: PgPool,
    service: Arc<TicketService>,
    http_listener: TcpListener,
    grpc_addr: SocketAddr,
    app: Router,
}

impl Application {
    /// Connect, migrate, wire the service and bind the listeners.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if the database, the event sink or either
    /// listener cannot be set up.
    pub async fn build(
        config: Config,
        metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
    ) -> Result<Self, BootstrapError> {
        let pool = connect_database(&config).await?;
        ticket_history_postgres::migrate(&pool).await?;
        info!("Migrations applied");

        let service = Arc::new(build_service(&config, pool.clone())?);
        let repository = Arc::new(PostgresTicketRepository::new(pool.clone()));

        let mut state = AppState::new(Arc::clone(&service)).with_probe(repository);
        if let Some(handle) = metrics {
            state = state.with_metrics(handle);
        }
        let app = router(state);

        let http_addr = config.server.http_addr();
        let http_listener = TcpListener::bind(&http_addr)
            .await
            .map_err(|source| BootstrapError::Bind {
                addr: http_addr.clone(),
                source,
            })?;

        let grpc_addr = resolve(&config.server.grpc_addr()).await?;

        Ok(Self {
            config,
            pool,
            service,
            http_listener,
            grpc_addr,
            app,
        })
    }

    /// Address the REST listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket has no local address.
    pub fn http_addr(&self) -> io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Serve until Ctrl+C or SIGTERM, then drain.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if either server fails.
    pub async fn run(self) -> Result<(), BootstrapError> {
        let Self {
            config,
            pool,
            service,
            http_listener,
            grpc_addr,
            app,
        } = self;
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let http_shutdown = wait_for(shutdown_tx.subscribe());
        let grpc_shutdown = wait_for(shutdown_tx.subscribe());
        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            if signal_tx.send(()).is_err() {
                warn!("No listener left to stop");
            }
        });

        info!(address = %config.server.http_addr(), "HTTP server listening");
        let http = async {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(http_shutdown)
                .await
                .map_err(BootstrapError::Http)
        };

        info!(address = %grpc_addr, "gRPC server listening");
        let grpc = tonic::transport::Server::builder()
            .add_service(TicketGrpcService::new(Arc::clone(&service)).into_server())
            .serve_with_shutdown(grpc_addr, grpc_shutdown);
        let grpc = async { grpc.await.map_err(BootstrapError::from) };

        let result = tokio::try_join!(http, grpc);
        // Stop the other listener if one failed.
        let _ = shutdown_tx.send(());
        result?;

        info!("Listeners stopped, draining notifications");
        if !service.notifier().wait_idle(config.server.shutdown_timeout()).await {
            warn!(
                in_flight = service.notifier().in_flight(),
                "Notifications still running after the grace period"
            );
        }

        pool.close().await;
        info!("Graceful shutdown complete");
        Ok(())
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("http", &self.http_listener.local_addr().ok())
            .field("grpc", &self.grpc_addr)
            .finish_non_exhaustive()
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr, BootstrapError> {
    let bind_error = |source| BootstrapError::Bind {
        addr: addr.to_string(),
        source,
    };
    tokio::net::lookup_host(addr)
        .await
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| bind_error(io::Error::new(io::ErrorKind::NotFound, "address did not resolve")))
}

async fn wait_for(mut rx: broadcast::Receiver<()>) {
    // A closed channel also means shutdown.
    let _ = rx.recv().await;
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
