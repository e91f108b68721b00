//! Configuration type definitions
//!
//! Defaults reproduce the stock hotplate build: 30 °C setpoint, 10 s
//! maximum SSR burst, 1 s rest, ten minutes of history at one sample per
//! six seconds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest history capacity the firmware reserves storage for
pub const MAX_HISTORY_CAPACITY: usize = 240;

/// Default number of history samples
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Errors found while validating a configuration
///
/// Any of these is fatal at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Setpoint is not a finite number
    InvalidSetpoint,
    /// Tolerance is negative or not finite
    InvalidTolerance,
    /// Near-target band is negative or not finite
    InvalidBand,
    /// Minimum on-time is zero
    ZeroOnTime,
    /// Minimum on-time exceeds maximum on-time
    MinOnExceedsMaxOn,
    /// A task period is zero
    ZeroPeriod,
    /// History capacity is zero
    ZeroHistoryCapacity,
    /// History capacity exceeds the reserved storage
    HistoryCapacityTooLarge,
    /// RTD nominal or reference resistance is not positive
    InvalidRtd,
    /// Neither sensor channel is enabled
    NoSensor,
}

/// Duty-cycle controller parameters
///
/// Read-only once the control loop has started.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlParameters {
    /// Target temperature (°C)
    pub setpoint_c: f32,
    /// The heater switches on below `setpoint_c - tolerance_c`
    pub tolerance_c: f32,
    /// Floor for the adaptive on-time (ms)
    pub min_on_ms: u32,
    /// Initial on-time and watchdog cap (ms)
    pub max_on_ms: u32,
    /// Minimum rest between bursts (ms)
    pub off_ms: u32,
    /// On-time halves when a burst ends within this distance of the setpoint (°C)
    pub near_target_band_c: f32,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            setpoint_c: 30.0,
            tolerance_c: 0.05,
            min_on_ms: 100,
            max_on_ms: 10_000,
            off_ms: 1_000,
            near_target_band_c: 2.0,
        }
    }
}

impl ControlParameters {
    /// Check that the adaptive behaviour is well defined
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.setpoint_c.is_finite() {
            return Err(ConfigError::InvalidSetpoint);
        }
        if !self.tolerance_c.is_finite() || self.tolerance_c < 0.0 {
            return Err(ConfigError::InvalidTolerance);
        }
        if !self.near_target_band_c.is_finite() || self.near_target_band_c < 0.0 {
            return Err(ConfigError::InvalidBand);
        }
        if self.min_on_ms == 0 {
            return Err(ConfigError::ZeroOnTime);
        }
        if self.min_on_ms > self.max_on_ms {
            return Err(ConfigError::MinOnExceedsMaxOn);
        }
        Ok(())
    }
}

/// Task cadences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Sense/decide/actuate period (ms)
    pub control_period_ms: u32,
    /// History append period (ms)
    pub history_period_ms: u32,
    /// Display refresh period (ms)
    pub display_period_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            control_period_ms: 1_000,
            history_period_ms: 6_000,
            display_period_ms: 1_000,
        }
    }
}

/// History buffer sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistoryConfig {
    /// Number of samples kept
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// RTD connection style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RtdWiring {
    #[default]
    TwoWire,
    ThreeWire,
    FourWire,
}

/// Sensor channel setup
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// MAX31865 RTD channel fitted
    pub rtd: bool,
    pub rtd_wiring: RtdWiring,
    /// RTD resistance at 0 °C (100 for PT100)
    pub rtd_nominal_ohms: f32,
    /// MAX31865 reference resistor
    pub rtd_reference_ohms: f32,
    /// Lowest plausible RTD reading; colder trips the low threshold fault
    pub rtd_min_c: f32,
    /// Highest plausible RTD reading; hotter trips the high threshold fault
    pub rtd_max_c: f32,
    /// MAX31855 thermocouple channel fitted
    pub thermocouple: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            rtd: true,
            rtd_wiring: RtdWiring::TwoWire,
            rtd_nominal_ohms: 100.0,
            rtd_reference_ohms: 430.0,
            rtd_min_c: -50.0,
            rtd_max_c: 250.0,
            thermocouple: false,
        }
    }
}

/// Complete start-up configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HotplateConfig {
    pub control: ControlParameters,
    pub timing: TimingConfig,
    pub history: HistoryConfig,
    pub sensor: SensorConfig,
}

impl HotplateConfig {
    /// Validate every section
    ///
    /// The firmware refuses to start the control loop on any error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;

        let timing = &self.timing;
        if timing.control_period_ms == 0
            || timing.history_period_ms == 0
            || timing.display_period_ms == 0
        {
            return Err(ConfigError::ZeroPeriod);
        }

        if self.history.capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if self.history.capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::HistoryCapacityTooLarge);
        }

        let sensor = &self.sensor;
        if !sensor.rtd && !sensor.thermocouple {
            return Err(ConfigError::NoSensor);
        }
        if sensor.rtd
            && !(sensor.rtd_nominal_ohms > 0.0
                && sensor.rtd_reference_ohms > 0.0
                && sensor.rtd_min_c < sensor.rtd_max_c)
        {
            return Err(ConfigError::InvalidRtd);
        }

        Ok(())
    }
}
