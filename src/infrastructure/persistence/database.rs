use crate::config::DbConfig;
use anyhow::{Context, Result};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::info;

/// Database wrapper owning the connection pool
#[derive(Clone)]
pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&cfg.url())
            .await
            .with_context(|| {
                format!("Failed to connect to MySQL at {}:{}", cfg.host, cfg.port)
            })?;

        info!("Connected to database {} on {}", cfg.database, cfg.host);

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS BTC_DATA (
                Date DATE NOT NULL PRIMARY KEY,
                Open DOUBLE NOT NULL,
                High DOUBLE NOT NULL,
                Low DOUBLE NOT NULL,
                Price DOUBLE NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create BTC_DATA table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
