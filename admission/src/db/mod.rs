//! Database module providing PostgreSQL connection pooling and the repository
//! traits every service is written against.
//!
//! Each repository has a Postgres implementation (`Pg*`) and an in-memory
//! implementation (`Memory*`) used by tests and by the server's dev mode.

use sqlx::postgres::PgPool;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::{
    MemoryAnnouncementRepository, MemoryCandidateRepository, MemoryCodeRepository,
    MemoryRepartitionRepository, MemoryUserRepository,
};
pub use repository::{
    AnnouncementRepository, CandidateRepository, CodeRepository, PgAnnouncementRepository,
    PgCandidateRepository, PgCodeRepository, PgRepartitionRepository, PgUserRepository,
    RepartitionRepository, UserRepository,
};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use admission::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::development()).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = config.pool_options().connect(&config.database_url).await?;
        log::info!("Connected to {}", config.redacted_url());
        Ok(Self { pool })
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
