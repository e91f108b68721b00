//! Closed-loop heater control

pub mod controller;
pub mod task;

pub use controller::{ActuatorCommand, ActuatorController, ActuatorState, OffReason, Transition};
pub use task::{ControlLoop, CycleReport};
