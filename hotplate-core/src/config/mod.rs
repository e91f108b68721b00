//! Configuration
//!
//! Start-up configuration types, their validation, and the parser for the
//! embedded `hotplate.toml`.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
