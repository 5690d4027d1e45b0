pub mod coingecko;
pub mod persistence;
pub mod registry;
