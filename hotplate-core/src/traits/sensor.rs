//! Temperature sensor traits

use crate::sensor::{FaultKind, Measurement};

/// Family of the sensor behind a channel
///
/// Selects how the raw fault register is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    /// Platinum RTD behind a MAX31865 converter
    Rtd,
    /// K-type thermocouple behind a MAX31855 converter
    Thermocouple,
}

/// One raw conversion as reported by the converter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReading {
    /// Converted temperature in °C
    pub value_c: f32,
    /// Fault register contents, in the converter's own bit layout
    pub fault_bits: u8,
}

/// Errors raised while talking to a converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// Conversion did not complete within the polling budget
    Timeout,
    /// SPI transfer failed
    Bus,
}

impl ReadError {
    /// The fault kind this error is reported as
    pub fn fault_kind(self) -> FaultKind {
        match self {
            ReadError::Timeout => FaultKind::Timeout,
            ReadError::Bus => FaultKind::Bus,
        }
    }
}

/// Narrow hardware contract for a temperature converter
///
/// Implementations own the bus protocol. Every call must return within a
/// bounded time; a converter that never answers is a [`ReadError::Timeout`].
pub trait RawSensor {
    /// Which fault layout `read_raw` reports
    fn kind(&self) -> SensorKind;

    /// Run one conversion and read the fault register
    fn read_raw(&mut self) -> Result<RawReading, ReadError>;

    /// Clear the converter's latched fault bits
    fn clear_faults(&mut self) -> Result<(), ReadError>;
}

/// A temperature channel that always yields a [`Measurement`]
///
/// Failures are carried inside the measurement, never returned as errors.
pub trait SensorPort {
    /// Take one sample stamped with `now_ms`
    fn sample(&mut self, now_ms: u64) -> Measurement;
}
