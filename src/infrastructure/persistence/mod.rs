mod candle_store;
mod database;

pub use candle_store::CandleStore;
pub use database::Database;
