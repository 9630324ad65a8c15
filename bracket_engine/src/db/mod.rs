//! Storage for tournaments, brackets and prize payouts.
//!
//! [`Database`] owns the PostgreSQL pool and schema, [`PgBracketRepository`]
//! runs the bracket queries on it and [`InMemoryRepository`] offers the same
//! traits without a database.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::bracket::BracketResult;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::InMemoryRepository;
pub use repository::{BracketRepository, PayoutRepository, PgBracketRepository};

/// Bracket schema, applied by [`Database::connect`]
const SCHEMA: &str = include_str!("../../migrations/0001_bracket_schema.sql");

/// PostgreSQL pool carrying the bracket schema
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool and bring the bracket schema up to date.
    ///
    /// ```no_run
    /// use bracket_engine::db::{Database, DatabaseConfig};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    /// let _repo = db.repository();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> BracketResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        log::info!(
            "Bracket schema ready ({} max connections)",
            config.max_connections
        );
        Ok(db)
    }

    /// Apply the schema. Every statement is idempotent.
    pub async fn migrate(&self) -> BracketResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Repository sharing this pool
    pub fn repository(&self) -> PgBracketRepository {
        PgBracketRepository::new(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> BracketResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
