use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLC reading. `price` is the closing price, matching the
/// `Price` column of the `BTC_DATA` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
}
