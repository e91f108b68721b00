//! Temperature converter drivers

pub mod max31855;
pub mod max31865;

pub use max31855::{Max31855, Max31855Frame};
pub use max31865::{resistance_to_celsius, Max31865};
