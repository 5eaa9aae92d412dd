use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::AppConfig;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `config` - Application configuration (URL, pool size, acquire timeout)
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(config: &AppConfig) -> Result<DbPool, sqlx::Error> {
    tracing::debug!(
        "Creating database connection pool (max {} connections)",
        config.database_max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}
