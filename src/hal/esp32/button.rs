//! Mode button on an ESP32 GPIO.
//!
//! # Wiring
//!
//! - One side → GPIO10
//! - Other side → 3.3V
//!
//! The internal pull-down holds the pin low while released.

use crate::traits::ButtonInput;
use esp_idf_hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;

/// Raw, active-high push button.
///
/// Debouncing happens in [`crate::mode::ModeSwitch`].
pub struct Esp32Button<'d, P>
where
    P: InputPin + OutputPin,
{
    pin: PinDriver<'d, P, Input>,
}

impl<'d, P> Esp32Button<'d, P>
where
    P: InputPin + OutputPin,
{
    /// Configures the pin as an input with pull-down.
    ///
    /// # Errors
    ///
    /// Returns an error if GPIO initialization fails.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Down)?;
        Ok(Self { pin })
    }
}

impl<P> ButtonInput for Esp32Button<'_, P>
where
    P: InputPin + OutputPin,
{
    fn is_pressed(&mut self) -> bool {
        self.pin.is_high()
    }
}
