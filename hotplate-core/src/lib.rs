//! Board-agnostic core logic for the hotplate controller
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (sensor, actuator, renderer)
//! - Sensor fault decoding and measurement types
//! - SSR duty-cycle controller with adaptive on-time
//! - Bounded temperature history for the trend graph
//! - Shared state hand-off between the control and display tasks
//! - Configuration types, validation and parsing

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod display;
pub mod history;
pub mod sensor;
pub mod shared;
pub mod traits;
