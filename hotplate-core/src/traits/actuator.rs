//! Heater actuator trait

/// Output stage driving the heating element (SSR, MOSFET)
///
/// The control loop calls [`Actuator::set_energized`] once per decided
/// transition and never polls the hardware.
pub trait Actuator {
    /// Error raised by the underlying pin
    type Error;

    /// Energize or release the heating element
    fn set_energized(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Last commanded state
    fn is_energized(&self) -> bool;
}
