//! Database connection pool management
//!
//! Connection pooling for MySQL using SQLx, with configurable limits,
//! timeouts and health checks.

use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    ConnectOptions, MySqlPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::log::LevelFilter;

use rn_shared::config::DatabaseConfig;

use crate::errors::InfraError;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    /// SQLx MySQL connection pool
    pool: MySqlPool,
    /// Configuration used to create this pool
    config: DatabaseConfig,
}

impl DatabasePool {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `config` - Database configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfraError>` - Database pool or error
    pub async fn new(config: DatabaseConfig) -> Result<Self, InfraError> {
        tracing::info!(
            max_connections = config.max_connections,
            "creating database connection pool"
        );

        let mut connect_options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| InfraError::Config(format!("Invalid database URL: {}", e)))?;

        if config.enable_logging {
            connect_options = connect_options
                .log_statements(LevelFilter::Debug)
                .log_slow_statements(LevelFilter::Warn, Duration::from_secs(1));
        } else {
            connect_options = connect_options.log_statements(LevelFilter::Off);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .max_lifetime(Duration::from_secs(config.max_lifetime))
            .test_before_acquire(true)
            .connect_with(connect_options)
            .await?;

        Ok(Self { pool, config })
    }

    /// Access the underlying SQLx pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// The configuration this pool was created with
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Verify database connectivity
    pub async fn health_check(&self) -> Result<(), InfraError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database connection pool closed");
    }
}
