//! SSD1306 OLED telemetry display for ESP32.
//!
//! Shows up to four text rows of the current telemetry page.
//!
//! # Wiring
//!
//! - SDA → GPIO8 (also has onboard LED)
//! - SCL → GPIO9 (also shared with BOOT button)
//! - VCC → 3.3V
//! - GND → GND

use crate::traits::TelemetrySink;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use esp_idf_hal::i2c::I2cDriver;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

/// SSD1306 display type alias for cleaner code.
type DisplayDriver<'d> = Ssd1306<
    I2CInterface<I2cDriver<'d>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 OLED telemetry sink.
///
/// # Display Layout
///
/// ```text
/// ┌────────────────────────────┐
/// │ Gain: 0.25                 │  row 0
/// │                            │
/// │ PWM L:65% PWM R:55%        │  row 1
/// │                            │
/// │ COM: 54                    │  row 2
/// │                            │  row 3
/// └────────────────────────────┘
/// ```
pub struct Esp32Display<'d> {
    display: DisplayDriver<'d>,
    /// Framebuffer still holds the previous frame
    stale: bool,
}

impl<'d> Esp32Display<'d> {
    /// Vertical distance between rows in pixels.
    const ROW_PITCH: i32 = 16;

    /// Creates and initializes the display, blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the panel does not respond.
    pub fn new(i2c: I2cDriver<'d>) -> Result<Self, DisplayError> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display.init()?;
        display.clear(BinaryColor::Off)?;
        display.flush()?;

        Ok(Self {
            display,
            stale: false,
        })
    }
}

impl TelemetrySink for Esp32Display<'_> {
    type Error = DisplayError;

    fn write_row(&mut self, row: usize, text: &str) -> Result<(), Self::Error> {
        if self.stale {
            self.display.clear(BinaryColor::Off)?;
            self.stale = false;
        }
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let y = row as i32 * Self::ROW_PITCH;
        Text::with_baseline(text, Point::new(2, y), style, Baseline::Top).draw(&mut self.display)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stale = true;
        self.display.flush()?;
        Ok(())
    }
}

/// Display error type.
#[derive(Debug)]
pub struct DisplayError;

impl From<display_interface::DisplayError> for DisplayError {
    fn from(_: display_interface::DisplayError) -> Self {
        DisplayError
    }
}
