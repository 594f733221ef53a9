//! Two-channel motor PWM using the ESP32 LEDC peripheral.
//!
//! The ESP32 has no free-running counter with a programmable top value like
//! the PWM slices the steering firmware was tuned on. LEDC instead runs at a
//! fixed bit resolution, so this driver remembers the wrap each channel was
//! configured with and rescales every level onto the LEDC duty range:
//!
//! ```text
//! ledc_duty = level * (max_duty + 1) / (wrap + 1)
//! ```
//!
//! Duty ratios (and therefore motor speed) are preserved exactly; only the
//! number of distinct steps differs.

use crate::actuation::PwmTiming;
use crate::traits::{MotorChannel, PwmOutput};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::sys::EspError;

/// LEDC-backed PWM for the left and right drive motors.
///
/// Both channels share one LEDC timer running at the frequency from the
/// [`PwmTiming`] passed to [`Esp32Pwm::new`].
///
/// # Hardware Setup
///
/// - GPIO2 → left motor input (IN1)
/// - GPIO3 → right motor input (IN2)
///
/// # Example
///
/// ```ignore
/// use rs_linefollow::hal::esp32::Esp32Pwm;
/// use rs_linefollow::PwmTiming;
///
/// let peripherals = Peripherals::take()?;
/// let pwm = Esp32Pwm::new(
///     peripherals.pins.gpio2,
///     peripherals.pins.gpio3,
///     peripherals.ledc.timer0,
///     peripherals.ledc.channel0,
///     peripherals.ledc.channel1,
///     &PwmTiming::default(),
/// )?;
/// ```
pub struct Esp32Pwm<'d> {
    left: LedcDriver<'d>,
    right: LedcDriver<'d>,
    /// Wrap per channel as last configured
    wraps: [u32; 2],
    frequency_hz: u32,
}

impl<'d> Esp32Pwm<'d> {
    /// 10-bit LEDC duty resolution is available up to ~78 kHz on the C3.
    const RESOLUTION: Resolution = Resolution::Bits10;

    /// Creates both LEDC channels at the timing's frequency, outputs low.
    ///
    /// # Errors
    ///
    /// Returns an error if LEDC timer or channel initialization fails.
    pub fn new<T, TI, LC, LCI, RC, RCI, LP, LPI, RP, RPI>(
        left_pin: LP,
        right_pin: RP,
        timer: T,
        left_channel: LC,
        right_channel: RC,
        timing: &PwmTiming,
    ) -> Result<Self, EspError>
    where
        TI: esp_idf_hal::ledc::LedcTimer + 'd,
        T: Peripheral<P = TI> + 'd,
        LCI: esp_idf_hal::ledc::LedcChannel<SpeedMode = TI::SpeedMode> + 'd,
        LC: Peripheral<P = LCI> + 'd,
        RCI: esp_idf_hal::ledc::LedcChannel<SpeedMode = TI::SpeedMode> + 'd,
        RC: Peripheral<P = RCI> + 'd,
        LPI: esp_idf_hal::gpio::OutputPin + 'd,
        LP: Peripheral<P = LPI> + 'd,
        RPI: esp_idf_hal::gpio::OutputPin + 'd,
        RP: Peripheral<P = RPI> + 'd,
    {
        let timer_config = TimerConfig::default()
            .frequency(timing.frequency_hz.Hz())
            .resolution(Self::RESOLUTION);
        let timer_driver = LedcTimerDriver::new(timer, &timer_config)?;

        let mut left = LedcDriver::new(left_channel, &timer_driver, left_pin)?;
        let mut right = LedcDriver::new(right_channel, &timer_driver, right_pin)?;
        left.set_duty(0)?;
        right.set_duty(0)?;

        log::info!(
            "LEDC PWM at {} Hz, {} duty steps",
            timing.frequency_hz,
            left.get_max_duty() + 1
        );

        Ok(Self {
            left,
            right,
            wraps: [timing.wrap(); 2],
            frequency_hz: timing.frequency_hz,
        })
    }

    fn driver(&mut self, channel: MotorChannel) -> &mut LedcDriver<'d> {
        match channel {
            MotorChannel::Left => &mut self.left,
            MotorChannel::Right => &mut self.right,
        }
    }

    /// Rescale a level in `0..=wrap + 1` onto `0..=max_duty`.
    fn ledc_duty(level: u32, wrap: u32, max_duty: u32) -> u32 {
        let scaled = level as u64 * (max_duty as u64 + 1) / (wrap as u64 + 1);
        scaled.min(max_duty as u64) as u32
    }
}

impl PwmOutput for Esp32Pwm<'_> {
    type Error = EspError;

    fn configure(&mut self, channel: MotorChannel, timing: &PwmTiming) -> Result<(), EspError> {
        if timing.frequency_hz != self.frequency_hz {
            // The shared LEDC timer was set up in `new`
            log::warn!(
                "{} channel asked for {} Hz, timer runs at {} Hz",
                channel.as_str(),
                timing.frequency_hz,
                self.frequency_hz
            );
        }
        self.wraps[channel.index()] = timing.wrap();
        self.driver(channel).enable()
    }

    fn write_level(&mut self, channel: MotorChannel, level: u32) -> Result<(), EspError> {
        let wrap = self.wraps[channel.index()];
        let driver = self.driver(channel);
        let duty = Self::ledc_duty(level, wrap, driver.get_max_duty());
        driver.set_duty(duty)
    }
}
