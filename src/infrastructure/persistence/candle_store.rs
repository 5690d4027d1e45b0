//! Repository for the `BTC_DATA` table.

use crate::domain::market::OhlcRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::mysql::{MySqlPool, MySqlRow};
use tracing::info;

pub struct CandleStore {
    pool: MySqlPool,
}

impl CandleStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Upserts daily readings through a temporary staging table: rows land in
    /// `TMP_BTC_DATA` first, then only dates not already present are copied
    /// into `BTC_DATA`. Returns the number of rows actually inserted.
    pub async fn upsert(&self, records: &[OhlcRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open upsert transaction")?;

        sqlx::query("DROP TEMPORARY TABLE IF EXISTS TMP_BTC_DATA")
            .execute(&mut *tx)
            .await
            .context("Failed to drop stale staging table")?;

        sqlx::query("CREATE TEMPORARY TABLE TMP_BTC_DATA LIKE BTC_DATA")
            .execute(&mut *tx)
            .await
            .context("Failed to create staging table")?;

        for r in records {
            sqlx::query(
                "INSERT INTO TMP_BTC_DATA (Date, Open, High, Low, Price) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(r.date)
            .bind(r.open)
            .bind(r.high)
            .bind(r.low)
            .bind(r.price)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to stage row for {}", r.date))?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO BTC_DATA (Date, Open, High, Low, Price)
            SELECT t.Date, t.Open, t.High, t.Low, t.Price
            FROM TMP_BTC_DATA t
            WHERE NOT EXISTS (SELECT 1 FROM BTC_DATA m WHERE m.Date = t.Date)
            "#,
        )
        .execute(&mut *tx)
        .await
        .context("Failed to merge staging rows into BTC_DATA")?;

        sqlx::query("DROP TEMPORARY TABLE TMP_BTC_DATA")
            .execute(&mut *tx)
            .await
            .context("Failed to drop staging table")?;

        tx.commit().await.context("Failed to commit upsert")?;

        let inserted = result.rows_affected();
        info!(
            "Upserted {} new of {} fetched rows into BTC_DATA",
            inserted,
            records.len()
        );
        Ok(inserted)
    }

    /// All readings in chronological order.
    pub async fn load_all(&self) -> Result<Vec<OhlcRecord>> {
        let rows = sqlx::query(
            "SELECT Date, Open, High, Low, Price FROM BTC_DATA ORDER BY Date",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load BTC_DATA")?;

        rows.iter().map(row_to_record).collect()
    }

    /// The `rows` most recent readings, returned in chronological order.
    pub async fn recent_window(&self, rows: u32) -> Result<Vec<OhlcRecord>> {
        let fetched = sqlx::query(
            r#"
            SELECT Date, Open, High, Low, Price
            FROM BTC_DATA
            ORDER BY Date DESC
            LIMIT ?
            "#,
        )
        .bind(rows)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load recent window from BTC_DATA")?;

        let mut records: Vec<OhlcRecord> =
            fetched.iter().map(row_to_record).collect::<Result<_>>()?;
        records.reverse();
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM BTC_DATA")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count BTC_DATA rows")?;
        row.try_get::<i64, _>("n").context("Missing count column")
    }
}

fn row_to_record(row: &MySqlRow) -> Result<OhlcRecord> {
    Ok(OhlcRecord {
        date: row.try_get::<NaiveDate, _>("Date")?,
        open: row.try_get::<f64, _>("Open")?,
        high: row.try_get::<f64, _>("High")?,
        low: row.try_get::<f64, _>("Low")?,
        price: row.try_get::<f64, _>("Price")?,
    })
}
