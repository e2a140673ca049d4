use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Connects the Postgres pool at startup. A database that cannot be reached
/// is fatal; the process has nothing to serve without it.
pub async fn create_pool(config: &Config) -> PgPool {
    let pool = PgPoolOptions::new()
        .min_connections(config.db.pool_min)
        .max_connections(config.db.pool_max)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url())
        .await
        .expect("Failed to connect to PostgreSQL");

    tracing::info!(
        host = %config.db.host,
        database = %config.db.database,
        "connected to postgres"
    );
    pool
}
