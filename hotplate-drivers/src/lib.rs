//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in hotplate-core for the hotplate hardware:
//!
//! - Temperature converters (MAX31865 RTD, MAX31855 thermocouple)
//! - SSR output on a GPIO pin
//! - ILI9341 TFT panel and the trend view drawn on it

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod actuator;
pub mod display;
pub mod sensor;
