//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic and the
//! hardware-specific implementations in `hotplate-drivers`.

pub mod actuator;
pub mod render;
pub mod sensor;

pub use actuator::Actuator;
pub use render::TrendRenderer;
pub use sensor::{RawReading, RawSensor, ReadError, SensorKind, SensorPort};
