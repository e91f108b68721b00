//! Temperature history for the trend graph
//!
//! A fixed-capacity ring of (actual, target) samples. Capacity is chosen at
//! construction, bounded by the storage reserved through `N`, and never
//! changes. Once full, each append overwrites the oldest sample.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use crate::config::ConfigError;

/// One history entry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HistorySample {
    /// Measured temperature (°C); NaN while the sensor was faulted
    pub actual_c: f32,
    /// Setpoint at the time of the sample (°C)
    pub target_c: f32,
    /// Position in the append order, starting at 0
    pub sequence: u32,
}

impl HistorySample {
    const EMPTY: Self = Self {
        actual_c: 0.0,
        target_c: 0.0,
        sequence: 0,
    };
}

/// Bounded circular log
///
/// `N` is the reserved storage; the effective capacity may be smaller.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<const N: usize> {
    samples: [HistorySample; N],
    capacity: usize,
    /// Next slot to write
    head: usize,
    len: usize,
    next_sequence: u32,
}

impl<const N: usize> HistoryBuffer<N> {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if capacity > N {
            return Err(ConfigError::HistoryCapacityTooLarge);
        }
        Ok(Self {
            samples: [HistorySample::EMPTY; N],
            capacity,
            head: 0,
            len: 0,
            next_sequence: 0,
        })
    }

    /// Record a sample, overwriting the oldest once full
    pub fn append(&mut self, actual_c: f32, target_c: f32) {
        self.samples[self.head] = HistorySample {
            actual_c,
            target_c,
            sequence: self.next_sequence,
        };
        self.head = (self.head + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
        self.next_sequence = self.next_sequence.wrapping_add(1);
    }

    /// Samples ordered oldest to newest
    pub fn snapshot(&self) -> Vec<HistorySample, N> {
        let start = (self.head + self.capacity - self.len) % self.capacity;
        let mut out = Vec::new();
        for i in 0..self.len {
            // Cannot overflow: len <= capacity <= N
            let _ = out.push(self.samples[(start + i) % self.capacity]);
        }
        out
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<HistorySample> {
        if self.len == 0 {
            None
        } else {
            Some(self.samples[(self.head + self.capacity - 1) % self.capacity])
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// History buffer shared between the control and display tasks
///
/// Every access holds a critical section for the duration of one append or
/// one copy, so a snapshot never contains a half-written sample.
pub struct SharedHistory<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<HistoryBuffer<N>>>,
}

impl<const N: usize> SharedHistory<N> {
    pub fn new(buffer: HistoryBuffer<N>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(buffer)),
        }
    }

    pub fn append(&self, actual_c: f32, target_c: f32) {
        self.inner
            .lock(|buffer| buffer.borrow_mut().append(actual_c, target_c));
    }

    pub fn snapshot(&self) -> Vec<HistorySample, N> {
        self.inner.lock(|buffer| buffer.borrow().snapshot())
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|buffer| buffer.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock(|buffer| buffer.borrow().capacity())
    }
}
