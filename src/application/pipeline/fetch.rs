//! FETCH stage: market data in, deduplicated daily rows upserted.

use crate::infrastructure::coingecko::CoinGeckoClient;
use crate::infrastructure::persistence::CandleStore;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub fetched: usize,
    pub inserted: u64,
}

pub async fn run(
    client: &CoinGeckoClient,
    store: &CandleStore,
    days: u32,
) -> Result<FetchReport> {
    let records = client.fetch_daily_ohlc(days).await?;
    let inserted = store.upsert(&records).await?;
    Ok(FetchReport {
        fetched: records.len(),
        inserted,
    })
}
