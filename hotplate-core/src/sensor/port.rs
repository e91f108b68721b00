//! Sensor port over a raw converter

use super::fault::{FaultKind, FaultSet};
use super::measurement::Measurement;
use crate::traits::{RawSensor, SensorPort};

/// Turns a [`RawSensor`] into a [`SensorPort`]
///
/// Decodes the fault register, clears the fault latch when anything is
/// set, and maps bus errors and timeouts to faulted measurements.
pub struct Port<S> {
    sensor: S,
}

impl<S: RawSensor> Port<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    /// Get access to the underlying converter
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Release the underlying converter
    pub fn into_inner(self) -> S {
        self.sensor
    }
}

impl<S: RawSensor> SensorPort for Port<S> {
    fn sample(&mut self, now_ms: u64) -> Measurement {
        let raw = match self.sensor.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                return Measurement::fault(f32::NAN, FaultSet::single(e.fault_kind()), now_ms)
            }
        };

        let mut faults = FaultSet::decode(self.sensor.kind(), raw.fault_bits);
        if !faults.is_empty() {
            if self.sensor.clear_faults().is_err() {
                faults.insert(FaultKind::Bus);
            }
            return Measurement::fault(raw.value_c, faults, now_ms);
        }

        if !raw.value_c.is_finite() {
            return Measurement::fault(raw.value_c, FaultSet::single(FaultKind::Bus), now_ms);
        }

        Measurement::ok(raw.value_c, now_ms)
    }
}

/// Placeholder for a channel that is not fitted
///
/// Uninhabited, so an `Option<NoSensor>` is always `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoSensor {}

impl SensorPort for NoSensor {
    fn sample(&mut self, _now_ms: u64) -> Measurement {
        match *self {}
    }
}
