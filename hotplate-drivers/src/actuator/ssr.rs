//! Solid-state relay output
//!
//! Drives the SSR input from a single GPIO pin. Many SSR boards are
//! active-low, so the pin polarity is configurable.

use embedded_hal::digital::OutputPin;
use hotplate_core::traits::Actuator;

/// SSR driven by a GPIO pin
pub struct SsrOutput<P> {
    pin: P,
    /// If true, SSR ON = pin LOW
    inverted: bool,
    /// Last state the pin accepted (true = heater energized)
    on: bool,
}

impl<P: OutputPin> SsrOutput<P> {
    /// Take the pin and drive the SSR off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin wired to the SSR input
    /// - `inverted`: If true, the SSR conducts while the pin is LOW
    pub fn new(pin: P, inverted: bool) -> Result<Self, P::Error> {
        let mut ssr = Self {
            pin,
            inverted,
            on: true,
        };
        ssr.set_energized(false)?;
        Ok(ssr)
    }

    /// SSR that conducts while the pin is high
    pub fn new_active_high(pin: P) -> Result<Self, P::Error> {
        Self::new(pin, false)
    }

    /// SSR that conducts while the pin is low
    pub fn new_active_low(pin: P) -> Result<Self, P::Error> {
        Self::new(pin, true)
    }

    /// Release the pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Actuator for SsrOutput<P> {
    type Error = P::Error;

    fn set_energized(&mut self, on: bool) -> Result<(), P::Error> {
        if on != self.inverted {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.on
    }
}
