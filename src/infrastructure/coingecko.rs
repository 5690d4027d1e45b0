//! CoinGecko market-data client.
//!
//! Fetches 30 days of sub-daily BTC/USD OHLC candles and reduces them to one
//! reading per day (the midnight-UTC candle).

use crate::domain::market::OhlcRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Timelike};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Raw candle as returned by the API: `[ts_ms, open, high, low, close]`.
type RawCandle = [f64; 5];

pub struct CoinGeckoClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Fetches `days` of BTC/USD OHLC candles and filters them down to the
    /// midnight-UTC reading per day.
    pub async fn fetch_daily_ohlc(&self, days: u32) -> Result<Vec<OhlcRecord>> {
        let url = format!("{}/coins/bitcoin/ohlc", self.base_url);

        let raw: Vec<RawCandle> = self
            .client
            .get(&url)
            .query(&[("vs_currency", "usd"), ("days", &days.to_string())])
            .header("x-cg-demo-api-key", &self.api_key)
            .send()
            .await
            .context("CoinGecko request failed")?
            .error_for_status()
            .context("CoinGecko returned an error status")?
            .json()
            .await
            .context("Failed to decode CoinGecko OHLC response")?;

        debug!("Fetched {} raw candles from CoinGecko", raw.len());
        let records = midnight_readings(&raw);
        info!("Reduced to {} daily readings", records.len());
        Ok(records)
    }
}

/// Keeps the candle whose timestamp falls in the midnight-UTC hour, one per
/// date.
pub fn midnight_readings(raw: &[RawCandle]) -> Vec<OhlcRecord> {
    let mut records: Vec<OhlcRecord> = Vec::new();

    for candle in raw {
        let Some(ts) = DateTime::from_timestamp_millis(candle[0] as i64) else {
            continue;
        };
        if ts.hour() != 0 {
            continue;
        }
        let date = ts.date_naive();
        if records.last().is_some_and(|r| r.date == date) {
            continue;
        }
        records.push(OhlcRecord {
            date,
            open: candle[1],
            high: candle[2],
            low: candle[3],
            price: candle[4],
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candle(date: &str, hour: u32, open: f64) -> RawCandle {
        let ts = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        [ts as f64, open, open + 2.0, open - 1.0, open + 1.0]
    }

    #[test]
    fn keeps_only_midnight_candles() {
        let raw = vec![
            candle("2024-06-01", 0, 100.0),
            candle("2024-06-01", 4, 101.0),
            candle("2024-06-01", 20, 102.0),
            candle("2024-06-02", 0, 110.0),
            candle("2024-06-02", 12, 111.0),
        ];

        let records = midnight_readings(&raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(records[0].open, 100.0);
        assert_eq!(records[0].price, 101.0);
        assert_eq!(records[1].open, 110.0);
    }

    #[test]
    fn deduplicates_within_the_midnight_hour() {
        let raw = vec![
            candle("2024-06-01", 0, 100.0),
            candle("2024-06-01", 0, 105.0),
        ];
        let records = midnight_readings(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].open, 100.0);
    }

    #[test]
    fn empty_input_yields_no_records() {
        assert!(midnight_readings(&[]).is_empty());
    }
}
