//! Data models for RateWatch

mod alert;
mod rate;

pub use alert::*;
pub use rate::*;
