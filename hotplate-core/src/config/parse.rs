//! Minimal TOML parser for the hotplate configuration
//!
//! Handles only the subset the configuration file uses. It does NOT
//! support the full TOML spec.
//!
//! Supported features:
//! - `[section]` headers
//! - `key = value` pairs (float, integer, boolean, string)
//! - Comments (`# ...`), including trailing comments
//!
//! Keys missing from the file keep their default values. The parsed
//! configuration is validated before it is returned.

use super::types::{ConfigError, HotplateConfig, RtdWiring};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is not `key = value`
    InvalidLine,
    /// Key not known in the current section
    UnknownKey,
    /// Value does not fit the key's type
    InvalidValue,
    /// File parsed but the configuration is unusable
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Control,
    Timing,
    History,
    Sensor,
}

/// Parse and validate a configuration file
pub fn parse_config(input: &str) -> Result<HotplateConfig, ParseError> {
    let mut config = HotplateConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(ParseError::InvalidLine)?;
        apply(&mut config, section, key.trim(), value.trim())?;
    }

    config.validate()?;
    Ok(config)
}

/// Drop a trailing comment, ignoring `#` inside quoted strings
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_section_header(line: &str) -> Result<Section, ParseError> {
    let name = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or(ParseError::InvalidSection)?
        .trim();

    match name {
        "control" => Ok(Section::Control),
        "timing" => Ok(Section::Timing),
        "history" => Ok(Section::History),
        "sensor" => Ok(Section::Sensor),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply(
    config: &mut HotplateConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ParseError> {
    match section {
        Section::Root => Err(ParseError::UnknownKey),
        Section::Control => {
            let control = &mut config.control;
            match key {
                "setpoint_c" => control.setpoint_c = parse_f32(value)?,
                "tolerance_c" => control.tolerance_c = parse_f32(value)?,
                "min_on_ms" => control.min_on_ms = parse_u32(value)?,
                "max_on_ms" => control.max_on_ms = parse_u32(value)?,
                "off_ms" => control.off_ms = parse_u32(value)?,
                "near_target_band_c" => control.near_target_band_c = parse_f32(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Timing => {
            let timing = &mut config.timing;
            match key {
                "control_period_ms" => timing.control_period_ms = parse_u32(value)?,
                "history_period_ms" => timing.history_period_ms = parse_u32(value)?,
                "display_period_ms" => timing.display_period_ms = parse_u32(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::History => match key {
            "capacity" => {
                config.history.capacity =
                    value.parse().map_err(|_| ParseError::InvalidValue)?;
                Ok(())
            }
            _ => Err(ParseError::UnknownKey),
        },
        Section::Sensor => {
            let sensor = &mut config.sensor;
            match key {
                "rtd" => sensor.rtd = parse_bool(value)?,
                "rtd_wiring" => sensor.rtd_wiring = parse_wiring(value)?,
                "rtd_nominal_ohms" => sensor.rtd_nominal_ohms = parse_f32(value)?,
                "rtd_reference_ohms" => sensor.rtd_reference_ohms = parse_f32(value)?,
                "rtd_min_c" => sensor.rtd_min_c = parse_f32(value)?,
                "rtd_max_c" => sensor.rtd_max_c = parse_f32(value)?,
                "thermocouple" => sensor.thermocouple = parse_bool(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
    }
}

fn parse_f32(value: &str) -> Result<f32, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Integers may use TOML `_` digit separators (`10_000`)
fn parse_u32(value: &str) -> Result<u32, ParseError> {
    let mut result: u32 = 0;
    let mut digits = 0;
    for c in value.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(10).ok_or(ParseError::InvalidValue)?;
        result = result
            .checked_mul(10)
            .and_then(|r| r.checked_add(d))
            .ok_or(ParseError::InvalidValue)?;
        digits += 1;
    }
    if digits == 0 {
        return Err(ParseError::InvalidValue);
    }
    Ok(result)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)
}

fn parse_wiring(value: &str) -> Result<RtdWiring, ParseError> {
    match parse_string(value)? {
        "two_wire" => Ok(RtdWiring::TwoWire),
        "three_wire" => Ok(RtdWiring::ThreeWire),
        "four_wire" => Ok(RtdWiring::FourWire),
        _ => Err(ParseError::InvalidValue),
    }
}
