//! TFT panel and trend view

pub mod ili9341;
pub mod trend;

pub use ili9341::Ili9341;
pub use trend::{TrendLayout, TrendView};
