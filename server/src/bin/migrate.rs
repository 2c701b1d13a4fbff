//! Apply pending database migrations and exit.

use ticket_history_server::bootstrap::connect_database;
use ticket_history_server::{Config, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing()?;

    let config = Config::from_env()?;
    let pool = connect_database(&config).await?;

    tracing::info!("Applying migrations");
    ticket_history_postgres::migrate(&pool).await?;
    tracing::info!("Migrations up to date");

    pool.close().await;
    Ok(())
}
