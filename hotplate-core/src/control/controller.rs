//! SSR duty-cycle controller
//!
//! Two states, OFF and ON. The heater switches on when the temperature is
//! below `setpoint - tolerance` and it has rested for at least `off_ms`.
//! It switches off once it has been on for the current on-duration, no
//! matter what the temperature does; that cap is the watchdog bounding
//! worst-case energized time.
//!
//! Every switch-off where the last observed temperature is within
//! `near_target_band_c` of the setpoint halves the on-duration, floored at
//! `min_on_ms`. The adaptation only ever shrinks;
//! [`ActuatorController::reset_adaptation`] is the only way back to
//! `max_on_ms`.
//!
//! A faulted measurement forces the heater off immediately and keeps it
//! off until valid data returns. That switch-off adapts against the last
//! valid reading, if there was one.

use crate::config::ControlParameters;
use crate::sensor::Measurement;

/// Observable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorState {
    pub energized: bool,
    /// Time of the last transition, `None` before the first one
    pub since_ms: Option<u64>,
    /// Current adaptive on-time cap
    pub on_duration_ms: u32,
}

impl ActuatorState {
    /// Idle state before any control cycle
    pub const fn initial(on_duration_ms: u32) -> Self {
        Self {
            energized: false,
            since_ms: None,
            on_duration_ms,
        }
    }
}

/// Why the heater was switched off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OffReason {
    /// The on-duration elapsed
    OnTimeElapsed,
    /// The measurement was faulted
    SensorFault,
}

/// A state change decided in this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    On,
    Off(OffReason),
}

/// Result of one control decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    /// Desired output level
    pub energize: bool,
    /// Set when the output level changed in this cycle
    pub transition: Option<Transition>,
}

/// Duty-cycle decision engine
///
/// Pure apart from its own state: the caller performs the hardware write.
#[derive(Debug, Clone)]
pub struct ActuatorController {
    params: ControlParameters,
    state: ActuatorState,
    last_value_c: Option<f32>,
}

impl ActuatorController {
    /// Create a controller in the OFF state
    ///
    /// `params` should already be validated.
    pub fn new(params: ControlParameters) -> Self {
        Self {
            state: ActuatorState::initial(params.max_on_ms),
            params,
            last_value_c: None,
        }
    }

    pub fn params(&self) -> &ControlParameters {
        &self.params
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    /// Last temperature accepted as control input
    pub fn last_value_c(&self) -> Option<f32> {
        self.last_value_c
    }

    /// Restore the on-duration to `max_on_ms`
    pub fn reset_adaptation(&mut self) {
        self.state.on_duration_ms = self.params.max_on_ms;
    }

    /// Evaluate one control period
    pub fn decide(&mut self, measurement: &Measurement, now_ms: u64) -> ActuatorCommand {
        let Some(value_c) = measurement.valid_value() else {
            return self.fail_safe(now_ms);
        };
        self.last_value_c = Some(value_c);

        let transition = if self.state.energized {
            if self.elapsed_ms(now_ms) >= u64::from(self.state.on_duration_ms) {
                self.switch(false, now_ms);
                self.adapt(value_c);
                Some(Transition::Off(OffReason::OnTimeElapsed))
            } else {
                None
            }
        } else if value_c < self.params.setpoint_c - self.params.tolerance_c
            && self.rested(now_ms)
        {
            self.switch(true, now_ms);
            Some(Transition::On)
        } else {
            None
        };

        self.command(transition)
    }

    fn fail_safe(&mut self, now_ms: u64) -> ActuatorCommand {
        let transition = if self.state.energized {
            self.switch(false, now_ms);
            if let Some(value_c) = self.last_value_c {
                self.adapt(value_c);
            }
            Some(Transition::Off(OffReason::SensorFault))
        } else {
            None
        };
        self.command(transition)
    }

    fn adapt(&mut self, value_c: f32) {
        if self.params.setpoint_c - value_c <= self.params.near_target_band_c {
            self.state.on_duration_ms = (self.state.on_duration_ms / 2).max(self.params.min_on_ms);
        }
    }

    fn switch(&mut self, on: bool, now_ms: u64) {
        self.state.energized = on;
        self.state.since_ms = Some(now_ms);
    }

    fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.state
            .since_ms
            .map_or(u64::MAX, |since| now_ms.saturating_sub(since))
    }

    fn rested(&self, now_ms: u64) -> bool {
        self.elapsed_ms(now_ms) >= u64::from(self.params.off_ms)
    }

    fn command(&self, transition: Option<Transition>) -> ActuatorCommand {
        ActuatorCommand {
            energize: self.state.energized,
            transition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{FaultKind, FaultSet};
    use proptest::prelude::*;

    fn params() -> ControlParameters {
        ControlParameters {
            setpoint_c: 30.0,
            tolerance_c: 0.05,
            min_on_ms: 100,
            max_on_ms: 10_000,
            off_ms: 1_000,
            near_target_band_c: 2.0,
        }
    }

    fn open_circuit(t: u64) -> Measurement {
        Measurement::fault(f32::NAN, FaultSet::single(FaultKind::Open), t)
    }

    #[test]
    fn test_starts_off() {
        let controller = ActuatorController::new(params());
        let state = controller.state();
        assert!(!state.energized);
        assert_eq!(state.since_ms, None);
        assert_eq!(state.on_duration_ms, 10_000);
    }

    #[test]
    fn test_turns_on_below_band() {
        let mut controller = ActuatorController::new(params());
        let cmd = controller.decide(&Measurement::ok(29.0, 0), 0);

        assert!(cmd.energize);
        assert_eq!(cmd.transition, Some(Transition::On));
        assert_eq!(controller.state().since_ms, Some(0));
    }

    #[test]
    fn test_stays_off_inside_tolerance() {
        let mut controller = ActuatorController::new(params());
        let cmd = controller.decide(&Measurement::ok(29.96, 0), 0);
        assert!(!cmd.energize);
        assert_eq!(cmd.transition, None);
    }

    #[test]
    fn test_watchdog_turns_off_and_halves_near_target() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(29.0, 0), 0);

        // Still inside the on window
        let cmd = controller.decide(&Measurement::ok(29.5, 9_999), 9_999);
        assert!(cmd.energize);
        assert_eq!(cmd.transition, None);

        let cmd = controller.decide(&Measurement::ok(30.06, 10_000), 10_000);
        assert!(!cmd.energize);
        assert_eq!(cmd.transition, Some(Transition::Off(OffReason::OnTimeElapsed)));
        assert_eq!(controller.state().on_duration_ms, 5_000);
    }

    #[test]
    fn test_no_shrink_far_from_target() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(20.0, 0), 0);
        let cmd = controller.decide(&Measurement::ok(25.0, 10_000), 10_000);

        assert!(!cmd.energize);
        // 30 - 25 = 5 > 2
        assert_eq!(controller.state().on_duration_ms, 10_000);
    }

    #[test]
    fn test_watchdog_ignores_temperature() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(10.0, 0), 0);
        // Far below setpoint, but the burst is over
        let cmd = controller.decide(&Measurement::ok(10.0, 10_000), 10_000);
        assert!(!cmd.energize);
    }

    #[test]
    fn test_off_time_lockout() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(20.0, 0), 0);
        controller.decide(&Measurement::ok(20.0, 10_000), 10_000);

        let cmd = controller.decide(&Measurement::ok(20.0, 10_999), 10_999);
        assert!(!cmd.energize);

        let cmd = controller.decide(&Measurement::ok(20.0, 11_000), 11_000);
        assert_eq!(cmd.transition, Some(Transition::On));
    }

    #[test]
    fn test_on_time_floor() {
        let mut controller = ActuatorController::new(params());
        let mut now = 0;
        for _ in 0..12 {
            controller.decide(&Measurement::ok(29.0, now), now);
            now += u64::from(controller.state().on_duration_ms);
            controller.decide(&Measurement::ok(29.5, now), now);
            now += 1_000;
        }
        assert_eq!(controller.state().on_duration_ms, 100);
    }

    #[test]
    fn test_fault_forces_off_and_adapts_on_last_value() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(29.5, 0), 0);

        let cmd = controller.decide(&open_circuit(500), 500);
        assert!(!cmd.energize);
        assert_eq!(cmd.transition, Some(Transition::Off(OffReason::SensorFault)));
        // 30 - 29.5 is inside the 2 degree band
        assert_eq!(controller.state().on_duration_ms, 5_000);
        assert_eq!(controller.state().since_ms, Some(500));
        assert_eq!(controller.last_value_c(), Some(29.5));
    }

    #[test]
    fn test_fault_off_far_from_target_keeps_on_time() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(20.0, 0), 0);

        controller.decide(&open_circuit(500), 500);
        assert_eq!(controller.state().on_duration_ms, 10_000);
    }

    #[test]
    fn test_fault_blocks_turn_on() {
        let mut controller = ActuatorController::new(params());
        for t in 0..5 {
            let cmd = controller.decide(&open_circuit(t * 1_000), t * 1_000);
            assert!(!cmd.energize);
            assert_eq!(cmd.transition, None);
        }
        assert_eq!(controller.last_value_c(), None);

        // Valid data again: normal rule applies
        let cmd = controller.decide(&Measurement::ok(29.0, 5_000), 5_000);
        assert!(cmd.energize);
    }

    #[test]
    fn test_reset_adaptation() {
        let mut controller = ActuatorController::new(params());
        controller.decide(&Measurement::ok(29.0, 0), 0);
        controller.decide(&Measurement::ok(29.0, 10_000), 10_000);
        assert_eq!(controller.state().on_duration_ms, 5_000);

        controller.reset_adaptation();
        assert_eq!(controller.state().on_duration_ms, 10_000);
    }

    fn measurement_strategy() -> impl Strategy<Value = Option<f32>> {
        prop_oneof![
            4 => (0.0f32..60.0).prop_map(Some),
            1 => Just(None),
        ]
    }

    proptest! {
        #[test]
        fn prop_never_turns_on_while_faulted(
            readings in proptest::collection::vec(measurement_strategy(), 1..200),
            step_ms in 100u64..3_000,
        ) {
            let mut controller = ActuatorController::new(params());
            let mut now = 0;
            for reading in readings {
                let m = match reading {
                    Some(v) => Measurement::ok(v, now),
                    None => open_circuit(now),
                };
                let cmd = controller.decide(&m, now);
                if !m.is_valid() {
                    prop_assert!(!cmd.energize);
                    prop_assert_ne!(cmd.transition, Some(Transition::On));
                }
                now += step_ms;
            }
        }

        #[test]
        fn prop_on_duration_monotone_and_floored(
            readings in proptest::collection::vec(measurement_strategy(), 1..300),
            step_ms in 100u64..12_000,
        ) {
            let p = params();
            let mut controller = ActuatorController::new(p);
            let mut previous = controller.state().on_duration_ms;
            let mut now = 0;
            for reading in readings {
                let m = match reading {
                    Some(v) => Measurement::ok(v, now),
                    None => open_circuit(now),
                };
                controller.decide(&m, now);
                let current = controller.state().on_duration_ms;
                prop_assert!(current <= previous);
                prop_assert!(current >= p.min_on_ms);
                prop_assert!(current <= p.max_on_ms);
                previous = current;
                now += step_ms;
            }
        }

        #[test]
        fn prop_energized_time_is_bounded(
            readings in proptest::collection::vec(0.0f32..60.0, 1..200),
            step_ms in 100u64..2_000,
        ) {
            let mut controller = ActuatorController::new(params());
            let mut now = 0;
            for v in readings {
                let cmd = controller.decide(&Measurement::ok(v, now), now);
                if cmd.energize {
                    let state = controller.state();
                    let since = state.since_ms.unwrap();
                    prop_assert!(now - since < u64::from(state.on_duration_ms));
                }
                now += step_ms;
            }
        }
    }
}
