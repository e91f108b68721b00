//! One control cycle: sense, decide, actuate, publish
//!
//! [`ControlLoop`] owns the sensor ports, the controller and the actuator.
//! It is the only writer of the actuator output and of the shared state.
//! The firmware task calls [`ControlLoop::step`] from its ticker.

use super::controller::{ActuatorCommand, ActuatorController};
use crate::config::ControlParameters;
use crate::history::SharedHistory;
use crate::sensor::{Measurement, NoSensor};
use crate::shared::{SharedSnapshot, SharedState};
use crate::traits::{Actuator, SensorPort};

/// Outcome of one [`ControlLoop::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub command: ActuatorCommand,
    /// Snapshot published in this cycle
    pub snapshot: SharedSnapshot,
    /// Whether a history sample was appended
    pub history_appended: bool,
}

/// Periodic control cycle
///
/// `P` drives the controller; `S` is an optional monitoring channel whose
/// faults are reported but never affect the other channel.
pub struct ControlLoop<'a, P, A, const N: usize, S = NoSensor> {
    primary: P,
    secondary: Option<S>,
    controller: ActuatorController,
    actuator: A,
    state: &'a SharedState,
    history: &'a SharedHistory<N>,
    history_period_ms: u32,
    last_history_ms: Option<u64>,
    sequence: u32,
}

impl<'a, P, A, const N: usize> ControlLoop<'a, P, A, N, NoSensor>
where
    P: SensorPort,
    A: Actuator,
{
    /// Build a single-channel loop
    ///
    /// `params` should already be validated.
    pub fn new(
        primary: P,
        actuator: A,
        params: ControlParameters,
        state: &'a SharedState,
        history: &'a SharedHistory<N>,
        history_period_ms: u32,
    ) -> Self {
        Self {
            primary,
            secondary: None,
            controller: ActuatorController::new(params),
            actuator,
            state,
            history,
            history_period_ms,
            last_history_ms: None,
            sequence: 0,
        }
    }

    /// Add a monitoring-only channel
    pub fn with_secondary<S: SensorPort>(self, secondary: S) -> ControlLoop<'a, P, A, N, S> {
        ControlLoop {
            primary: self.primary,
            secondary: Some(secondary),
            controller: self.controller,
            actuator: self.actuator,
            state: self.state,
            history: self.history,
            history_period_ms: self.history_period_ms,
            last_history_ms: self.last_history_ms,
            sequence: self.sequence,
        }
    }
}

impl<'a, P, A, const N: usize, S> ControlLoop<'a, P, A, N, S>
where
    P: SensorPort,
    A: Actuator,
    S: SensorPort,
{
    pub fn controller(&self) -> &ActuatorController {
        &self.controller
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Restore the adaptive on-time to its maximum
    pub fn reset_adaptation(&mut self) {
        self.controller.reset_adaptation();
    }

    /// Run one cycle at `now_ms`
    ///
    /// The actuator is written only when the decided level differs from
    /// the last level it accepted, which is once per transition unless a
    /// write failed. A failed write skips the publish and returns the
    /// error; the next cycle retries it.
    pub fn step(&mut self, now_ms: u64) -> Result<CycleReport, A::Error> {
        let primary = self.primary.sample(now_ms);
        let secondary = self.secondary.as_mut().map(|port| port.sample(now_ms));

        let command = self.controller.decide(&primary, now_ms);
        if command.energize != self.actuator.is_energized() {
            self.actuator.set_energized(command.energize)?;
        }

        let snapshot = self.publish(primary, secondary);
        let history_appended = self.record_history(&primary, now_ms);

        Ok(CycleReport {
            command,
            snapshot,
            history_appended,
        })
    }

    fn publish(&mut self, primary: Measurement, secondary: Option<Measurement>) -> SharedSnapshot {
        // Zero is reserved for "never published"
        self.sequence = self.sequence.checked_add(1).unwrap_or(1);

        let faults = secondary
            .map_or(primary.faults(), |m| primary.faults().union(m.faults()));

        let snapshot = SharedSnapshot {
            sequence: self.sequence,
            primary: Some(primary),
            secondary,
            actuator: self.controller.state(),
            setpoint_c: self.controller.params().setpoint_c,
            faults,
        };
        self.state.publish(snapshot);
        snapshot
    }

    fn record_history(&mut self, primary: &Measurement, now_ms: u64) -> bool {
        let period = u64::from(self.history_period_ms);
        let slot = match self.last_history_ms {
            None => now_ms,
            Some(last) => {
                let next = last.saturating_add(period);
                if now_ms < next {
                    return false;
                }
                // A single late tick keeps the grid; a longer stall restarts it
                if now_ms - next >= period {
                    now_ms
                } else {
                    next
                }
            }
        };

        // NaN leaves a gap in the trend while the sensor is faulted
        let actual_c = primary.valid_value().unwrap_or(f32::NAN);
        self.history
            .append(actual_c, self.controller.params().setpoint_c);
        self.last_history_ms = Some(slot);
        true
    }
}
