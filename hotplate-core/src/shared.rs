//! Control-to-display state hand-off
//!
//! The control task publishes a complete [`SharedSnapshot`] each cycle;
//! readers always get a copy of one whole published snapshot. The value is
//! `Copy` and swapped inside a short critical section, so a read can never
//! mix fields from two publishes and neither side waits on the other for
//! longer than one copy.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::control::ActuatorState;
use crate::sensor::{FaultSet, Measurement};

/// Everything the display needs from one control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SharedSnapshot {
    /// Publish counter; 0 means nothing has been published yet
    pub sequence: u32,
    /// Reading from the channel that drives control
    pub primary: Option<Measurement>,
    /// Reading from the monitoring-only channel, if fitted
    pub secondary: Option<Measurement>,
    pub actuator: ActuatorState,
    pub setpoint_c: f32,
    /// Union of the faults on all channels
    pub faults: FaultSet,
}

impl SharedSnapshot {
    /// Placeholder seen by readers before the first publish
    pub const EMPTY: Self = Self {
        sequence: 0,
        primary: None,
        secondary: None,
        actuator: ActuatorState::initial(0),
        setpoint_c: 0.0,
        faults: FaultSet::EMPTY,
    };

    /// Whether a control cycle has published yet
    pub fn is_published(&self) -> bool {
        self.sequence != 0
    }

    /// Primary temperature if it is currently trustworthy
    pub fn temperature_c(&self) -> Option<f32> {
        self.primary.and_then(|m| m.valid_value())
    }

    pub fn has_fault(&self) -> bool {
        !self.faults.is_empty()
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Single-writer, many-reader snapshot channel
pub struct SharedState {
    inner: Mutex<CriticalSectionRawMutex, Cell<SharedSnapshot>>,
}

impl SharedState {
    /// Create a channel holding [`SharedSnapshot::EMPTY`]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(SharedSnapshot::EMPTY)),
        }
    }

    /// Replace the current snapshot
    ///
    /// Only the control task calls this.
    pub fn publish(&self, snapshot: SharedSnapshot) {
        self.inner.lock(|cell| cell.set(snapshot));
    }

    /// Copy of the most recently published snapshot
    pub fn read(&self) -> SharedSnapshot {
        self.inner.lock(Cell::get)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::FaultKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Every field derived from the same counter, so a torn read is visible
    fn snapshot_for(k: u32) -> SharedSnapshot {
        let faults = if k % 3 == 0 {
            FaultSet::single(FaultKind::Timeout)
        } else {
            FaultSet::EMPTY
        };
        SharedSnapshot {
            sequence: k,
            primary: Some(Measurement::ok(k as f32, u64::from(k) * 10)),
            secondary: Some(Measurement::ok(k as f32 + 0.5, u64::from(k) * 10)),
            actuator: ActuatorState {
                energized: k % 2 == 1,
                since_ms: Some(u64::from(k)),
                on_duration_ms: k,
            },
            setpoint_c: k as f32,
            faults,
        }
    }

    #[test]
    fn test_read_before_publish() {
        let state = SharedState::new();
        let snapshot = state.read();
        assert!(!snapshot.is_published());
        assert_eq!(snapshot.temperature_c(), None);
    }

    #[test]
    fn test_read_returns_latest() {
        let state = SharedState::new();
        state.publish(snapshot_for(1));
        state.publish(snapshot_for(2));
        assert_eq!(state.read(), snapshot_for(2));
        assert_eq!(state.read().temperature_c(), Some(2.0));
    }

    #[test]
    fn test_concurrent_reads_are_never_torn() {
        let state = Arc::new(SharedState::new());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for k in 1..=50_000 {
                    state.publish(snapshot_for(k));
                }
                done.store(true, Ordering::Release);
            })
        };

        let readers: std::vec::Vec<_> = (0..3)
            .map(|_| {
                let state = Arc::clone(&state);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut last = 0;
                    while !done.load(Ordering::Acquire) {
                        let snapshot = state.read();
                        if snapshot.is_published() {
                            assert_eq!(snapshot, snapshot_for(snapshot.sequence));
                            assert!(snapshot.sequence >= last);
                            last = snapshot.sequence;
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(state.read().sequence, 50_000);
    }
}
