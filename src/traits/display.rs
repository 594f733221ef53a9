//! Telemetry sink abstraction.
//!
//! This module defines the [`TelemetrySink`] trait for showing short text rows
//! on a display (OLED, LCD, serial console, etc.). Telemetry is purely
//! cosmetic: the control loop ignores every error returned here.

/// Display trait for rendering telemetry rows.
///
/// Implementors provide hardware-specific rendering for displays like
/// SSD1306 OLED, character LCDs, or simulated displays for testing.
///
/// # Example
///
/// ```ignore
/// use rs_linefollow::traits::TelemetrySink;
///
/// struct MyDisplay { /* ... */ }
///
/// impl TelemetrySink for MyDisplay {
///     type Error = ();
///
///     fn write_row(&mut self, row: usize, text: &str) -> Result<(), ()> {
///         // Draw text at row * 10 px...
///         Ok(())
///     }
///     fn flush(&mut self) -> Result<(), ()> {
///         // Push framebuffer to the panel...
///         Ok(())
///     }
/// }
/// ```
pub trait TelemetrySink {
    /// Error type for display operations.
    type Error;

    /// Writes one row of text into the back buffer.
    ///
    /// Rows written since the last [`flush`](Self::flush) make up one frame;
    /// rows not written are blank.
    fn write_row(&mut self, row: usize, text: &str) -> Result<(), Self::Error>;

    /// Makes the rows written since the last flush visible.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Sink that discards everything.
///
/// Used when no display is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    type Error = core::convert::Infallible;

    fn write_row(&mut self, _row: usize, _text: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
