//! Temperature measurements

use super::fault::{FaultKind, FaultSet};

/// Whether a measurement may feed the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validity {
    Ok,
    /// One or more faults were active when the sample was taken
    Fault(FaultSet),
}

/// One temperature sample
///
/// Produced once per sampling period and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Temperature in °C. Reported even when faulted, but never trusted.
    pub value_c: f32,
    pub validity: Validity,
    /// Monotonic timestamp (ms since boot)
    pub timestamp_ms: u64,
}

impl Measurement {
    /// A valid reading
    pub const fn ok(value_c: f32, timestamp_ms: u64) -> Self {
        Self {
            value_c,
            validity: Validity::Ok,
            timestamp_ms,
        }
    }

    /// A faulted reading
    ///
    /// An empty `faults` set is promoted to [`FaultKind::Bus`] so a faulted
    /// measurement always names at least one cause.
    pub fn fault(value_c: f32, faults: FaultSet, timestamp_ms: u64) -> Self {
        let faults = if faults.is_empty() {
            FaultSet::single(FaultKind::Bus)
        } else {
            faults
        };
        Self {
            value_c,
            validity: Validity::Fault(faults),
            timestamp_ms,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.validity, Validity::Ok)
    }

    /// The temperature, if it may be used for control
    pub fn valid_value(&self) -> Option<f32> {
        match self.validity {
            Validity::Ok => Some(self.value_c),
            Validity::Fault(_) => None,
        }
    }

    /// Active faults (empty when valid)
    pub fn faults(&self) -> FaultSet {
        match self.validity {
            Validity::Ok => FaultSet::EMPTY,
            Validity::Fault(set) => set,
        }
    }
}
