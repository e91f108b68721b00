//! MAX31865 RTD-to-digital converter
//!
//! Platinum RTD (PT100/PT1000) front end on SPI. Each reading runs a
//! one-shot conversion with the bias enabled only for its duration, then
//! the automatic fault-detection cycle, and reads the ratio and the fault
//! status register.
//!
//! The high and low fault thresholds bound the plausible temperature
//! window, so a shorted or open element reads as a fault, not as a
//! temperature.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use hotplate_core::config::{RtdWiring, SensorConfig};
use hotplate_core::traits::{RawReading, RawSensor, ReadError, SensorKind};

/// Register addresses
mod reg {
    pub const CONFIG: u8 = 0x00;
    pub const RTD_MSB: u8 = 0x01;
    pub const HIGH_FAULT_MSB: u8 = 0x03;
    pub const FAULT_STATUS: u8 = 0x07;
    /// Address bit selecting a write
    pub const WRITE: u8 = 0x80;
}

/// Configuration register bits
mod cfg {
    pub const BIAS: u8 = 0x80;
    pub const ONE_SHOT: u8 = 0x20;
    pub const THREE_WIRE: u8 = 0x10;
    /// D3:D2, reads back zero once the cycle is done
    pub const FAULT_DETECT_MASK: u8 = 0x0C;
    pub const FAULT_DETECT_AUTO: u8 = 0x04;
    pub const FAULT_CLEAR: u8 = 0x02;
    pub const FILTER_50HZ: u8 = 0x01;
}

/// Bias settle time before a conversion (ms)
const BIAS_SETTLE_MS: u32 = 10;

/// Nominal one-shot conversion time with the 60 Hz filter (ms)
const CONVERSION_MS: u32 = 65;

/// Poll interval while waiting for the one-shot bit to clear (ms)
const POLL_INTERVAL_MS: u32 = 5;

/// Polls before a conversion counts as timed out
const MAX_POLLS: u32 = 10;

/// Full scale of the 15-bit ratio code
const RATIO_FULL_SCALE: f32 = 32768.0;

const RATIO_MAX: u16 = 0x7FFF;

// Callendar-Van Dusen coefficients (IEC 60751)
const RTD_A: f32 = 3.9083e-3;
const RTD_B: f32 = -5.775e-7;
const RTD_C: f32 = -4.183e-12;

/// RTD resistance at a temperature (Callendar-Van Dusen)
pub fn celsius_to_resistance(celsius: f32, nominal_ohms: f32) -> f32 {
    let t = celsius;
    let mut ratio = 1.0 + RTD_A * t + RTD_B * t * t;
    if t < 0.0 {
        ratio += RTD_C * (t - 100.0) * t * t * t;
    }
    nominal_ohms * ratio
}

/// Convert an RTD resistance to °C
///
/// Uses the Callendar-Van Dusen quadratic solution above 0 °C and a fifth
/// order polynomial fit below it.
pub fn resistance_to_celsius(resistance_ohms: f32, nominal_ohms: f32) -> f32 {
    let z1 = -RTD_A;
    let z2 = RTD_A * RTD_A - 4.0 * RTD_B;
    let z3 = (4.0 * RTD_B) / nominal_ohms;
    let z4 = 2.0 * RTD_B;

    let temp = (libm::sqrtf(z2 + z3 * resistance_ohms) + z1) / z4;
    if temp >= 0.0 {
        return temp;
    }

    // Normalise to PT100 for the polynomial
    let r = resistance_ohms / nominal_ohms * 100.0;
    let mut rpoly = r;
    let mut temp = -242.02;
    temp += 2.2228 * rpoly;
    rpoly *= r;
    temp += 2.5859e-3 * rpoly;
    rpoly *= r;
    temp -= 4.8260e-6 * rpoly;
    rpoly *= r;
    temp -= 2.8183e-8 * rpoly;
    rpoly *= r;
    temp += 1.5243e-10 * rpoly;
    temp
}

/// MAX31865 on an SPI bus
pub struct Max31865<SPI, D> {
    spi: SPI,
    delay: D,
    wiring: RtdWiring,
    filter_50hz: bool,
    nominal_ohms: f32,
    reference_ohms: f32,
    /// Ratio codes below this raise the low threshold fault
    low_threshold: u16,
    /// Ratio codes above this raise the high threshold fault
    high_threshold: u16,
}

impl<SPI: SpiDevice, D: DelayNs> Max31865<SPI, D> {
    /// Create a driver for a PT100 with the given wiring and reference resistor
    ///
    /// Call [`Max31865::init`] before the first reading.
    pub fn new(
        spi: SPI,
        delay: D,
        wiring: RtdWiring,
        nominal_ohms: f32,
        reference_ohms: f32,
    ) -> Self {
        Self {
            spi,
            delay,
            wiring,
            filter_50hz: false,
            nominal_ohms,
            reference_ohms,
            low_threshold: 0,
            high_threshold: RATIO_MAX,
        }
    }

    /// Create a driver from the sensor section of the configuration
    pub fn from_config(spi: SPI, delay: D, config: &SensorConfig) -> Self {
        Self::new(
            spi,
            delay,
            config.rtd_wiring,
            config.rtd_nominal_ohms,
            config.rtd_reference_ohms,
        )
        .with_window(config.rtd_min_c, config.rtd_max_c)
    }

    /// Flag readings outside `min_c..=max_c` through the threshold faults
    ///
    /// Takes effect at the next [`Max31865::init`].
    pub fn with_window(mut self, min_c: f32, max_c: f32) -> Self {
        let low_ohms = celsius_to_resistance(min_c, self.nominal_ohms);
        let high_ohms = celsius_to_resistance(max_c, self.nominal_ohms);
        self.low_threshold = self.resistance_to_ratio(low_ohms);
        self.high_threshold = self.resistance_to_ratio(high_ohms);
        self
    }

    /// Reject 50 Hz instead of 60 Hz mains noise
    pub fn with_50hz_filter(mut self) -> Self {
        self.filter_50hz = true;
        self
    }

    /// Put the converter into a known idle state
    ///
    /// Bias off, one-shot mode, fault thresholds programmed, faults cleared.
    pub fn init(&mut self) -> Result<(), ReadError> {
        let [high_msb, high_lsb] = (self.high_threshold << 1).to_be_bytes();
        let [low_msb, low_lsb] = (self.low_threshold << 1).to_be_bytes();
        self.spi
            .write(&[reg::HIGH_FAULT_MSB | reg::WRITE, high_msb, high_lsb, low_msb, low_lsb])
            .map_err(|_| ReadError::Bus)?;
        self.write_config(self.base_config())?;
        self.clear_faults()
    }

    /// Run one conversion and return the raw 15-bit ratio code
    ///
    /// The automatic fault-detection cycle runs right after the conversion
    /// while the bias is still settled; anything it finds stays latched in
    /// the fault status register.
    pub fn read_ratio(&mut self) -> Result<u16, ReadError> {
        self.clear_faults()?;

        let base = self.base_config();
        self.write_config(base | cfg::BIAS)?;
        self.delay.delay_ms(BIAS_SETTLE_MS);

        let ratio = self.convert_and_check(base);
        // Bias off on every path, the RTD self-heats otherwise
        let bias_off = self.write_config(base);
        let ratio = ratio?;
        bias_off?;
        Ok(ratio)
    }

    /// Convert a ratio code to the RTD resistance
    pub fn ratio_to_resistance(&self, ratio: u16) -> f32 {
        f32::from(ratio) / RATIO_FULL_SCALE * self.reference_ohms
    }

    fn resistance_to_ratio(&self, resistance_ohms: f32) -> u16 {
        let code = resistance_ohms / self.reference_ohms * RATIO_FULL_SCALE;
        if code <= 0.0 {
            0
        } else if code >= f32::from(RATIO_MAX) {
            RATIO_MAX
        } else {
            code as u16
        }
    }

    /// Read the fault status register
    pub fn read_fault_status(&mut self) -> Result<u8, ReadError> {
        let mut buf = [0u8; 1];
        self.read_registers(reg::FAULT_STATUS, &mut buf)?;
        Ok(buf[0])
    }

    fn convert_and_check(&mut self, base: u8) -> Result<u16, ReadError> {
        self.write_config(base | cfg::BIAS | cfg::ONE_SHOT)?;
        self.delay.delay_ms(CONVERSION_MS);
        self.wait_until_clear(cfg::ONE_SHOT)?;

        let mut buf = [0u8; 2];
        self.read_registers(reg::RTD_MSB, &mut buf)?;

        self.write_config(base | cfg::BIAS | cfg::FAULT_DETECT_AUTO)?;
        self.wait_until_clear(cfg::FAULT_DETECT_MASK)?;

        // Bit 0 of the LSB is the fault flag
        Ok(u16::from_be_bytes(buf) >> 1)
    }

    fn wait_until_clear(&mut self, bits: u8) -> Result<(), ReadError> {
        for _ in 0..MAX_POLLS {
            let mut config = [0u8; 1];
            self.read_registers(reg::CONFIG, &mut config)?;
            if config[0] & bits == 0 {
                return Ok(());
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        Err(ReadError::Timeout)
    }

    fn base_config(&self) -> u8 {
        let mut config = 0;
        if self.wiring == RtdWiring::ThreeWire {
            config |= cfg::THREE_WIRE;
        }
        if self.filter_50hz {
            config |= cfg::FILTER_50HZ;
        }
        config
    }

    fn write_config(&mut self, value: u8) -> Result<(), ReadError> {
        self.spi
            .write(&[reg::CONFIG | reg::WRITE, value])
            .map_err(|_| ReadError::Bus)
    }

    fn read_registers(&mut self, address: u8, buf: &mut [u8]) -> Result<(), ReadError> {
        self.spi
            .transaction(&mut [Operation::Write(&[address]), Operation::Read(buf)])
            .map_err(|_| ReadError::Bus)
    }
}

impl<SPI: SpiDevice, D: DelayNs> RawSensor for Max31865<SPI, D> {
    fn kind(&self) -> SensorKind {
        SensorKind::Rtd
    }

    fn read_raw(&mut self) -> Result<RawReading, ReadError> {
        let ratio = self.read_ratio()?;
        let fault_bits = self.read_fault_status()?;
        let resistance = self.ratio_to_resistance(ratio);

        Ok(RawReading {
            value_c: resistance_to_celsius(resistance, self.nominal_ohms),
            fault_bits,
        })
    }

    fn clear_faults(&mut self) -> Result<(), ReadError> {
        self.write_config(self.base_config() | cfg::FAULT_CLEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{ErrorKind, ErrorType};
    use hotplate_core::sensor::fault::rtd_bits;
    use hotplate_core::sensor::{FaultKind, FaultSet, Port};
    use hotplate_core::traits::SensorPort;
    use proptest::prelude::*;

    /// Register-level model of the converter
    struct MockMax31865 {
        regs: [u8; 8],
        /// Config reads that still report the one-shot bit
        busy_polls: u32,
        conversion_polls: u32,
        config_writes: std::vec::Vec<u8>,
        fault_clears: u32,
        /// REFIN/RTDIN bits found by the fault-detection cycle
        input_faults: u8,
        broken: bool,
    }

    impl MockMax31865 {
        fn with_ratio(ratio: u16) -> Self {
            let code = ratio << 1;
            let mut regs = [0u8; 8];
            regs[1] = (code >> 8) as u8;
            regs[2] = code as u8;
            // Power-on thresholds: high 0xFFFF, low 0x0000
            regs[3] = 0xFF;
            regs[4] = 0xFF;
            Self {
                regs,
                busy_polls: 0,
                conversion_polls: 2,
                config_writes: std::vec::Vec::new(),
                fault_clears: 0,
                input_faults: 0,
                broken: false,
            }
        }

        fn write(&mut self, address: u8, data: &[u8]) {
            if address == reg::CONFIG {
                let value = data[0];
                self.config_writes.push(value);
                if value & cfg::FAULT_CLEAR != 0 {
                    self.fault_clears += 1;
                    self.regs[reg::FAULT_STATUS as usize] = 0;
                }
                if value & cfg::ONE_SHOT != 0 {
                    self.busy_polls = self.conversion_polls;
                    self.regs[reg::FAULT_STATUS as usize] |= self.threshold_faults();
                }
                if value & cfg::FAULT_DETECT_MASK == cfg::FAULT_DETECT_AUTO {
                    self.regs[reg::FAULT_STATUS as usize] |= self.input_faults;
                }
                self.regs[0] = value & !cfg::FAULT_CLEAR;
                return;
            }
            for (i, byte) in data.iter().enumerate() {
                self.regs[address as usize + i] = *byte;
            }
        }

        fn code_at(&self, msb: usize) -> u16 {
            u16::from_be_bytes([self.regs[msb], self.regs[msb + 1]]) >> 1
        }

        fn threshold_faults(&self) -> u8 {
            let code = self.code_at(1);
            let mut bits = 0;
            if code > self.code_at(3) {
                bits |= rtd_bits::HIGH_THRESHOLD;
            }
            if code < self.code_at(5) {
                bits |= rtd_bits::LOW_THRESHOLD;
            }
            bits
        }

        fn read(&mut self, address: u8, buf: &mut [u8]) {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = self.regs[address as usize + i];
            }
            if address == reg::CONFIG {
                if self.busy_polls > 0 {
                    self.busy_polls -= 1;
                } else {
                    let done = !(cfg::ONE_SHOT | cfg::FAULT_DETECT_MASK);
                    self.regs[0] &= done;
                    buf[0] &= done;
                }
            }
        }
    }

    impl ErrorType for MockMax31865 {
        type Error = ErrorKind;
    }

    impl SpiDevice for MockMax31865 {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
            if self.broken {
                return Err(ErrorKind::Other);
            }
            let mut address = 0;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        address = bytes[0] & !reg::WRITE;
                        if bytes[0] & reg::WRITE != 0 {
                            self.write(address, &bytes[1..]);
                        }
                    }
                    Operation::Read(buf) => self.read(address, buf),
                    _ => return Err(ErrorKind::Other),
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDelay {
        total_ms: u32,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }
    }

    fn pt100(mock: MockMax31865) -> Max31865<MockMax31865, MockDelay> {
        Max31865::new(mock, MockDelay::default(), RtdWiring::TwoWire, 100.0, 430.0)
    }

    /// Ratio code for a resistance with the 430 Ω reference
    fn ratio_for(ohms: f32) -> u16 {
        (ohms / 430.0 * 32768.0) as u16
    }

    #[test]
    fn test_resistance_to_celsius_reference_points() {
        assert!(resistance_to_celsius(100.0, 100.0).abs() < 0.05);
        assert!((resistance_to_celsius(119.40, 100.0) - 50.0).abs() < 0.1);
        assert!((resistance_to_celsius(138.51, 100.0) - 100.0).abs() < 0.1);
        // Below zero takes the polynomial branch
        assert!((resistance_to_celsius(92.16, 100.0) + 20.0).abs() < 0.1);
        // PT1000 scales with the nominal resistance
        assert!((resistance_to_celsius(1385.1, 1000.0) - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_read_runs_one_shot_conversion() {
        let mut rtd = pt100(MockMax31865::with_ratio(ratio_for(111.67)));
        let raw = rtd.read_raw().unwrap();

        assert!((raw.value_c - 30.0).abs() < 0.2);
        assert_eq!(raw.fault_bits, 0);

        // clear, bias, bias + one-shot, fault detection, bias off
        assert_eq!(
            rtd.spi.config_writes,
            [
                cfg::FAULT_CLEAR,
                cfg::BIAS,
                cfg::BIAS | cfg::ONE_SHOT,
                cfg::BIAS | cfg::FAULT_DETECT_AUTO,
                0
            ]
        );
        assert!(rtd.delay.total_ms >= BIAS_SETTLE_MS + CONVERSION_MS);
    }

    #[test]
    fn test_three_wire_and_filter_bits() {
        let mut mock = MockMax31865::with_ratio(ratio_for(100.0));
        mock.conversion_polls = 0;
        let mut rtd =
            Max31865::new(mock, MockDelay::default(), RtdWiring::ThreeWire, 100.0, 430.0)
                .with_50hz_filter();
        rtd.init().unwrap();
        rtd.read_raw().unwrap();

        let mode = cfg::THREE_WIRE | cfg::FILTER_50HZ;
        assert!(rtd.spi.config_writes.iter().all(|w| w & mode == mode));
        // No window: thresholds opened fully
        assert_eq!(&rtd.spi.regs[3..7], &[0xFF, 0xFE, 0x00, 0x00]);
    }

    #[test]
    fn test_window_programs_thresholds() {
        let mut rtd = Max31865::from_config(
            MockMax31865::with_ratio(ratio_for(100.0)),
            MockDelay::default(),
            &SensorConfig::default(),
        );
        rtd.init().unwrap();

        let high = rtd.ratio_to_resistance(rtd.spi.code_at(3));
        let low = rtd.ratio_to_resistance(rtd.spi.code_at(5));
        assert!((resistance_to_celsius(high, 100.0) - 250.0).abs() < 0.5);
        assert!((resistance_to_celsius(low, 100.0) + 50.0).abs() < 0.5);
    }

    fn windowed_port(ohms: f32) -> Port<Max31865<MockMax31865, MockDelay>> {
        let mut rtd = Max31865::from_config(
            MockMax31865::with_ratio(ratio_for(ohms)),
            MockDelay::default(),
            &SensorConfig::default(),
        );
        rtd.init().unwrap();
        Port::new(rtd)
    }

    #[test]
    fn test_shorted_element_is_a_fault() {
        let m = windowed_port(0.5).sample(0);
        assert!(!m.is_valid());
        assert_eq!(m.faults(), FaultSet::single(FaultKind::RtdLowThreshold));
    }

    #[test]
    fn test_reading_above_window_is_a_fault() {
        // About 300 °C
        let m = windowed_port(212.05).sample(0);
        assert!(!m.is_valid());
        assert_eq!(m.faults(), FaultSet::single(FaultKind::RtdHighThreshold));
    }

    #[test]
    fn test_reading_inside_window_is_valid() {
        let m = windowed_port(111.67).sample(0);
        assert!(m.is_valid());
        assert!((m.value_c - 30.0).abs() < 0.2);
    }

    #[test]
    fn test_stuck_conversion_times_out_with_bias_off() {
        let mut mock = MockMax31865::with_ratio(ratio_for(100.0));
        mock.conversion_polls = MAX_POLLS + 5;
        let mut rtd = pt100(mock);

        assert_eq!(rtd.read_raw(), Err(ReadError::Timeout));
        assert_eq!(rtd.spi.config_writes.last(), Some(&0));
    }

    #[test]
    fn test_bus_error() {
        let mut mock = MockMax31865::with_ratio(ratio_for(100.0));
        mock.broken = true;
        let mut rtd = pt100(mock);

        assert_eq!(rtd.read_raw(), Err(ReadError::Bus));
    }

    #[test]
    fn test_fault_detection_reaches_port_and_is_cleared() {
        let mut mock = MockMax31865::with_ratio(ratio_for(100.0));
        mock.input_faults = rtd_bits::REFIN_LOW | rtd_bits::RTDIN_LOW;
        let mut port = Port::new(pt100(mock));

        let m = port.sample(0);
        assert!(!m.is_valid());
        assert!(m.faults().contains(FaultKind::RefInLow));
        assert!(m.faults().contains(FaultKind::RtdInLow));
        assert_eq!(m.faults().len(), 2);

        // Pre-conversion clear plus the clear after the fault was seen
        let rtd = port.into_inner();
        assert_eq!(rtd.spi.fault_clears, 2);
        assert_eq!(rtd.spi.regs[reg::FAULT_STATUS as usize], 0);
    }

    #[test]
    fn test_celsius_to_resistance_inverts_conversion() {
        for t in [-40.0f32, -5.0, 0.0, 30.0, 120.0, 250.0] {
            let r = celsius_to_resistance(t, 100.0);
            assert!((resistance_to_celsius(r, 100.0) - t).abs() < 0.1, "{t}");
        }
    }

    proptest! {
        #[test]
        fn prop_temperature_increases_with_resistance(r in 20.0f32..390.0, dr in 0.5f32..10.0) {
            let low = resistance_to_celsius(r, 100.0);
            let high = resistance_to_celsius(r + dr, 100.0);
            prop_assert!(high > low);
        }
    }
}
