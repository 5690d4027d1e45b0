pub mod lstm;
pub mod scaler;
pub mod windowing;
