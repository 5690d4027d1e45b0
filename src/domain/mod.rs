pub mod errors;
pub mod market;
pub mod ml;
