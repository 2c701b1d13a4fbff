//! Push every stored ticket to the search index.
//!
//! Prefers Kafka (`KAFKA_BROKERS` + `KAFKA_TOPIC_TICKET`) and falls back to
//! the search service over HTTP (`SEARCH_SERVICE_URL`). With neither set it
//! only reports how many tickets exist.

use ticket_history_server::bootstrap::{build_service, connect_database};
use ticket_history_server::{BootstrapError, Config, init_tracing, reindex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing()?;

    let config = Config::from_env()?;
    let pool = connect_database(&config).await?;
    let service = build_service(&config, pool.clone())?;

    let summary = reindex(&service)
        .await
        .map_err(|e| BootstrapError::Database(e.to_string()))?;
    tracing::info!(
        total = summary.total,
        delivered = summary.delivered,
        failed = summary.failed,
        "reindex-search finished"
    );

    pool.close().await;
    Ok(())
}
