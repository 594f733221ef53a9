//! Gain potentiometer on the ESP32 ADC.
//!
//! # Wiring
//!
//! - Pot ends → 3.3V and GND
//! - Wiper → GPIO4 (ADC1 channel 4)
//!
//! On ESP32-C3, ADC2 is unreliable while the radio is active, so the knob
//! stays on ADC1.

use crate::traits::AnalogInput;
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio4;
use esp_idf_hal::peripheral::Peripheral;

/// Gain knob read through a oneshot ADC channel.
///
/// # Example
///
/// ```ignore
/// use rs_linefollow::hal::esp32::Esp32Knob;
/// use esp_idf_hal::adc::oneshot::AdcDriver;
///
/// let peripherals = Peripherals::take()?;
/// let adc = AdcDriver::new(peripherals.adc1)?;
/// let knob = Esp32Knob::new(&adc, peripherals.pins.gpio4)?;
/// ```
pub struct Esp32Knob<'d> {
    channel: AdcChannelDriver<'d, Gpio4, &'d AdcDriver<'d, ADC1>>,
    /// Last good raw sample, reused if a read fails
    last_raw: u16,
}

impl<'d> Esp32Knob<'d> {
    /// Full-scale raw value of the 12-bit ADC.
    const FULL_SCALE: f32 = 4095.0;

    /// Creates the knob input with 11 dB attenuation (full 0 - 3.3V range).
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio4> + 'd,
    ) -> Result<Self, esp_idf_hal::sys::EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(adc, pin, &config)?;
        Ok(Self {
            channel,
            last_raw: 0,
        })
    }

    /// Last raw sample (0 - 4095).
    #[inline]
    pub fn raw(&self) -> u16 {
        self.last_raw
    }
}

impl AnalogInput for Esp32Knob<'_> {
    fn read_normalized(&mut self) -> f32 {
        match self.channel.read() {
            Ok(raw) => self.last_raw = raw,
            Err(e) => log::warn!("gain knob read failed: {}", e),
        }
        self.last_raw as f32 / Self::FULL_SCALE
    }
}
