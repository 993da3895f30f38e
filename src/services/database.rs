//! Database service: wraps the campaign-database connection pool for
//! lifecycle (start/stop/health). Other services that need the database
//! should declare `dependencies: ["database"]`.
//!
//! Schema creation and seeding are out of scope here (§1): the database
//! this core talks to already exists, owned by the process that writes
//! campaign data.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::query;
use tracing::{info, warn};

use crate::db::Database;
use crate::services::manager::{Service, ServiceHealth};

/// Configuration for the database service (connection URL, timeouts).
#[derive(Debug, Clone)]
pub struct DatabaseServiceConfig {
    /// SQLite connection URL, e.g. `sqlite://./data/campaign.db`.
    pub database_url: String,
    /// How long to retry connecting before giving up.
    pub connect_timeout: Duration,
}

impl Default for DatabaseServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/campaign.db".to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Service that owns the database pool and provides start/stop/health.
/// Register this first so that services depending on `"database"` can
/// start after it.
pub struct DatabaseService {
    pool: Database,
}

impl DatabaseService {
    /// Create a new database service with an already-connected pool. Use
    /// [from_config](Self::from_config) to create from URL and timeout.
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }

    /// Create and connect the database service from config.
    pub async fn from_config(config: DatabaseServiceConfig) -> Result<Self> {
        let mut last_err = None;
        let deadline = tokio::time::Instant::now() + config.connect_timeout;
        loop {
            match Database::connect(&config.database_url).await {
                Ok(pool) => return Ok(Self::new(pool)),
                Err(e) => {
                    last_err = Some(e);
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
        Err(anyhow::anyhow!(
            "database service: connect failed after retrying: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        ))
    }

    /// Access the pool (e.g. to build a [crate::db::SqlxDbSession]).
    pub fn pool(&self) -> &Database {
        &self.pool
    }
}

#[async_trait]
impl Service for DatabaseService {
    fn name(&self) -> &str {
        "database"
    }

    async fn start(&self) -> Result<()> {
        info!(service = "database", "Database service starting");
        query("SELECT 1").execute(self.pool().sqlx_pool()).await?;
        info!(service = "database", "Database service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.pool.sqlx_pool().close().await;
        info!(service = "database", "Database service stopped");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        match query("SELECT 1").execute(self.pool().sqlx_pool()).await {
            Ok(_) => Ok(ServiceHealth::healthy()),
            Err(e) => {
                warn!(service = "database", error = %e, "Health check failed");
                Ok(ServiceHealth::unhealthy(e.to_string()))
            }
        }
    }
}
