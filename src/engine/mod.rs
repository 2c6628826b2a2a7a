//! Orchestration: the bulk FSDS run and the universe health check.

pub mod health;
pub mod pipeline;

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::sec::SecClient;
use crate::storage;

/// Shared handles for a command invocation.
pub struct AppContext {
    pub config: AppConfig,
    pub pool: SqlitePool,
    pub sec: Arc<SecClient>,
}

impl AppContext {
    /// Build the SEC client and open (and migrate) the database.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let sec = Arc::new(SecClient::new(&config.sec)?);
        let pool = storage::open(&config.database.resolved_url(), config.database.max_connections).await?;
        Ok(Self { config, pool, sec })
    }
}
