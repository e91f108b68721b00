//! Fault decoding
//!
//! Maps raw converter fault registers to named fault kinds. Decoding is
//! pure: no state, no I/O.

use core::fmt;

use crate::traits::SensorKind;

/// MAX31865 fault status register bits
pub mod rtd_bits {
    /// RTD ratio above the high fault threshold
    pub const HIGH_THRESHOLD: u8 = 0x80;
    /// RTD ratio below the low fault threshold
    pub const LOW_THRESHOLD: u8 = 0x40;
    /// REFIN- > 0.85 × VBIAS
    pub const REFIN_LOW: u8 = 0x20;
    /// REFIN- < 0.85 × VBIAS, FORCE- open
    pub const REFIN_HIGH: u8 = 0x10;
    /// RTDIN- < 0.85 × VBIAS, FORCE- open
    pub const RTDIN_LOW: u8 = 0x08;
    /// Over- or undervoltage on an input
    pub const OVER_UNDER_VOLTAGE: u8 = 0x04;
}

/// MAX31855 fault bits (low bits of the 32-bit frame)
pub mod thermocouple_bits {
    /// Thermocouple open (no connection)
    pub const OPEN: u8 = 0x01;
    /// Thermocouple shorted to GND
    pub const SHORT_TO_GROUND: u8 = 0x02;
    /// Thermocouple shorted to VCC
    pub const SHORT_TO_SUPPLY: u8 = 0x04;
}

/// A single named fault condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultKind {
    RtdHighThreshold,
    RtdLowThreshold,
    RefInHigh,
    RefInLow,
    RtdInLow,
    OverUnderVoltage,
    Open,
    ShortToGround,
    ShortToSupply,
    /// Converter did not answer in time
    Timeout,
    /// Bus transfer failed or the reading was unusable
    Bus,
}

impl FaultKind {
    /// Every kind, in bit order
    pub const ALL: [FaultKind; 11] = [
        FaultKind::RtdHighThreshold,
        FaultKind::RtdLowThreshold,
        FaultKind::RefInHigh,
        FaultKind::RefInLow,
        FaultKind::RtdInLow,
        FaultKind::OverUnderVoltage,
        FaultKind::Open,
        FaultKind::ShortToGround,
        FaultKind::ShortToSupply,
        FaultKind::Timeout,
        FaultKind::Bus,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Short human-readable description for the display and logs
    pub const fn description(self) -> &'static str {
        match self {
            FaultKind::RtdHighThreshold => "RTD high threshold",
            FaultKind::RtdLowThreshold => "RTD low threshold",
            FaultKind::RefInHigh => "REFIN- > 0.85 x Bias",
            FaultKind::RefInLow => "REFIN- < 0.85 x Bias - FORCE- open",
            FaultKind::RtdInLow => "RTDIN- < 0.85 x Bias - FORCE- open",
            FaultKind::OverUnderVoltage => "Under/Over voltage",
            FaultKind::Open => "Thermocouple open",
            FaultKind::ShortToGround => "Thermocouple shorted to GND",
            FaultKind::ShortToSupply => "Thermocouple shorted to VCC",
            FaultKind::Timeout => "Sensor timeout",
            FaultKind::Bus => "Sensor bus error",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Set of simultaneously active faults
///
/// Hardware can raise several bits at once, so a faulted measurement
/// carries a set rather than a single kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultSet(u16);

impl FaultSet {
    /// No active faults
    pub const EMPTY: Self = Self(0);

    /// A set holding exactly `kind`
    pub const fn single(kind: FaultKind) -> Self {
        Self(kind.bit())
    }

    /// Decode a raw fault register for the given sensor family
    ///
    /// Bits that have no meaning for the family are ignored.
    pub fn decode(sensor: SensorKind, bits: u8) -> Self {
        let table: &[(u8, FaultKind)] = match sensor {
            SensorKind::Rtd => &[
                (rtd_bits::HIGH_THRESHOLD, FaultKind::RtdHighThreshold),
                (rtd_bits::LOW_THRESHOLD, FaultKind::RtdLowThreshold),
                (rtd_bits::REFIN_LOW, FaultKind::RefInLow),
                (rtd_bits::REFIN_HIGH, FaultKind::RefInHigh),
                (rtd_bits::RTDIN_LOW, FaultKind::RtdInLow),
                (rtd_bits::OVER_UNDER_VOLTAGE, FaultKind::OverUnderVoltage),
            ],
            SensorKind::Thermocouple => &[
                (thermocouple_bits::OPEN, FaultKind::Open),
                (thermocouple_bits::SHORT_TO_GROUND, FaultKind::ShortToGround),
                (thermocouple_bits::SHORT_TO_SUPPLY, FaultKind::ShortToSupply),
            ],
        };

        table
            .iter()
            .filter(|(mask, _)| bits & mask != 0)
            .fold(Self::EMPTY, |set, &(_, kind)| set.with(kind))
    }

    /// Copy of this set with `kind` added
    #[must_use]
    pub const fn with(self, kind: FaultKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Add `kind` to the set
    pub fn insert(&mut self, kind: FaultKind) {
        self.0 |= kind.bit();
    }

    /// Union of two sets
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, kind: FaultKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of active kinds
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Active kinds in bit order
    pub fn iter(self) -> impl Iterator<Item = FaultKind> {
        FaultKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// First active kind, for single-line displays
    pub fn first(self) -> Option<FaultKind> {
        self.iter().next()
    }
}

impl FromIterator<FaultKind> for FaultSet {
    fn from_iter<I: IntoIterator<Item = FaultKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, FaultSet::with)
    }
}

impl fmt::Display for FaultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("OK");
        }
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.description())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use heapless::String;

    #[test]
    fn test_thermocouple_open_only() {
        let set = FaultSet::decode(SensorKind::Thermocouple, thermocouple_bits::OPEN);
        assert_eq!(set, FaultSet::single(FaultKind::Open));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_thermocouple_ignores_unknown_bits() {
        let set = FaultSet::decode(SensorKind::Thermocouple, 0xF8 | thermocouple_bits::OPEN);
        assert_eq!(set, FaultSet::single(FaultKind::Open));
    }

    #[test]
    fn test_rtd_multiple_bits() {
        let bits = rtd_bits::HIGH_THRESHOLD | rtd_bits::RTDIN_LOW | rtd_bits::OVER_UNDER_VOLTAGE;
        let set = FaultSet::decode(SensorKind::Rtd, bits);

        assert_eq!(set.len(), 3);
        assert!(set.contains(FaultKind::RtdHighThreshold));
        assert!(set.contains(FaultKind::RtdInLow));
        assert!(set.contains(FaultKind::OverUnderVoltage));
        assert!(!set.contains(FaultKind::RtdLowThreshold));
    }

    #[test]
    fn test_rtd_refin_bits() {
        assert_eq!(
            FaultSet::decode(SensorKind::Rtd, rtd_bits::REFIN_LOW),
            FaultSet::single(FaultKind::RefInLow)
        );
        assert_eq!(
            FaultSet::decode(SensorKind::Rtd, rtd_bits::REFIN_HIGH),
            FaultSet::single(FaultKind::RefInHigh)
        );
    }

    #[test]
    fn test_zero_bits_is_empty() {
        assert!(FaultSet::decode(SensorKind::Rtd, 0).is_empty());
        assert!(FaultSet::decode(SensorKind::Thermocouple, 0).is_empty());
        // Low two bits are unused by the MAX31865
        assert!(FaultSet::decode(SensorKind::Rtd, 0x03).is_empty());
    }

    #[test]
    fn test_display_lists_kinds() {
        let set: FaultSet = [FaultKind::Open, FaultKind::Timeout].into_iter().collect();
        let mut out: String<64> = String::new();
        write!(out, "{}", set).unwrap();
        assert_eq!(out.as_str(), "Thermocouple open, Sensor timeout");

        out.clear();
        write!(out, "{}", FaultSet::EMPTY).unwrap();
        assert_eq!(out.as_str(), "OK");
    }

    #[test]
    fn test_iter_in_bit_order() {
        let set = FaultSet::EMPTY
            .with(FaultKind::Bus)
            .with(FaultKind::RtdHighThreshold);
        let mut it = set.iter();
        assert_eq!(it.next(), Some(FaultKind::RtdHighThreshold));
        assert_eq!(it.next(), Some(FaultKind::Bus));
        assert_eq!(it.next(), None);
        assert_eq!(set.first(), Some(FaultKind::RtdHighThreshold));
    }
}
