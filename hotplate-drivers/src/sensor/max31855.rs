//! MAX31855 thermocouple-to-digital converter
//!
//! Read-only SPI device: every read clocks out one 32-bit frame holding the
//! thermocouple temperature, the cold-junction temperature and the fault
//! bits. Faults are not latched, so there is nothing to clear.

use embedded_hal::spi::SpiDevice;
use hotplate_core::traits::{RawReading, RawSensor, ReadError, SensorKind};

/// Fault flag (D16)
const FAULT_FLAG: u32 = 1 << 16;

/// OC, SCG and SCV bits (D0..D2)
const FAULT_MASK: u32 = 0x07;

/// One decoded frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Max31855Frame {
    /// Thermocouple temperature (°C, 0.25 °C resolution)
    pub thermocouple_c: f32,
    /// Cold-junction temperature (°C, 0.0625 °C resolution)
    pub internal_c: f32,
    /// OC/SCG/SCV bits, zero unless the fault flag is set
    pub fault_bits: u8,
}

impl Max31855Frame {
    /// Decode a raw 32-bit frame
    pub fn decode(frame: u32) -> Self {
        // 14-bit and 12-bit two's complement fields, sign-extended by
        // arithmetic shifts
        let thermocouple = (frame as i32) >> 18;
        let internal = ((frame << 16) as i32) >> 20;

        let fault_bits = if frame & FAULT_FLAG != 0 {
            (frame & FAULT_MASK) as u8
        } else {
            0
        };

        Self {
            thermocouple_c: thermocouple as f32 * 0.25,
            internal_c: internal as f32 * 0.0625,
            fault_bits,
        }
    }
}

/// MAX31855 on an SPI bus
pub struct Max31855<SPI> {
    spi: SPI,
    last_frame: Option<Max31855Frame>,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            last_frame: None,
        }
    }

    /// Clock out and decode one frame
    pub fn read_frame(&mut self) -> Result<Max31855Frame, ReadError> {
        let mut buf = [0u8; 4];
        self.spi.read(&mut buf).map_err(|_| ReadError::Bus)?;
        let frame = Max31855Frame::decode(u32::from_be_bytes(buf));
        self.last_frame = Some(frame);
        Ok(frame)
    }

    /// Most recent frame, including its cold-junction reading
    pub fn last_frame(&self) -> Option<Max31855Frame> {
        self.last_frame
    }
}

impl<SPI: SpiDevice> RawSensor for Max31855<SPI> {
    fn kind(&self) -> SensorKind {
        SensorKind::Thermocouple
    }

    fn read_raw(&mut self) -> Result<RawReading, ReadError> {
        let frame = self.read_frame()?;
        Ok(RawReading {
            value_c: frame.thermocouple_c,
            fault_bits: frame.fault_bits,
        })
    }

    fn clear_faults(&mut self) -> Result<(), ReadError> {
        Ok(())
    }
}
