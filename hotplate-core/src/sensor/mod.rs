//! Sensor acquisition
//!
//! Measurements, fault decoding and the port that joins a raw converter to
//! the control loop.

pub mod fault;
pub mod measurement;
pub mod port;

pub use fault::{FaultKind, FaultSet};
pub use measurement::{Measurement, Validity};
pub use port::{NoSensor, Port};
