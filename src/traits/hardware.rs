//! Hardware abstraction traits for motor PWM, the gain knob, the mode button
//! and timekeeping.
//!
//! This module defines the core hardware interfaces that allow rs-linefollow to
//! work across different platforms (ESP32, desktop mocks, etc.).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PwmOutput`] | Per-channel PWM generation for the two drive motors |
//! | [`AnalogInput`] | Normalized analog reading (gain potentiometer) |
//! | [`ButtonInput`] | Raw, undebounced push button level |
//! | [`Clock`] | Time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::traits::{MotorChannel, PwmOutput};
//! use rs_linefollow::actuation::PwmTiming;
//! use rs_linefollow::hal::MockPwm;
//!
//! let mut pwm = MockPwm::new();
//! pwm.configure(MotorChannel::Left, &PwmTiming::default()).unwrap();
//! pwm.write_level(MotorChannel::Left, 6250).unwrap();
//!
//! assert_eq!(pwm.level(MotorChannel::Left), 6250);
//! ```

use crate::actuation::PwmTiming;

/// One of the two drive motors.
///
/// The left motor is wired to the first PWM output (IN1), the right motor to
/// the second (IN2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MotorChannel {
    /// Left wheel motor.
    Left,
    /// Right wheel motor.
    Right,
}

impl MotorChannel {
    /// Both channels, left first.
    pub const ALL: [MotorChannel; 2] = [MotorChannel::Left, MotorChannel::Right];

    /// Returns the channel as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_linefollow::MotorChannel;
    ///
    /// assert_eq!(MotorChannel::Left.as_str(), "left");
    /// assert_eq!(MotorChannel::Right.as_str(), "right");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MotorChannel::Left => "left",
            MotorChannel::Right => "right",
        }
    }

    /// Array index of the channel (left = 0, right = 1).
    #[inline]
    pub const fn index(&self) -> usize {
        match self {
            MotorChannel::Left => 0,
            MotorChannel::Right => 1,
        }
    }
}

/// PWM output trait - abstracts the periodic drive signal of both motors.
///
/// Implement this trait for your PWM peripheral. The actuation layer computes
/// the channel resolution ("wrap") from a [`PwmTiming`] once and afterwards
/// only writes discrete levels in `0..=wrap + 1`.
///
/// # Implementation Notes
///
/// - `configure` may be called more than once with the same timing; it must
///   leave the channel in the same state each time
/// - `write_level` must be a single register update, no partial-update window
/// - A level of `wrap + 1` means fully on
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_linefollow::traits::{MotorChannel, PwmOutput};
/// use rs_linefollow::actuation::PwmTiming;
///
/// struct MyPwm { /* slice handles */ }
///
/// impl PwmOutput for MyPwm {
///     type Error = ();
///
///     fn configure(&mut self, channel: MotorChannel, timing: &PwmTiming) -> Result<(), ()> {
///         // Set clock divider and wrap register for the channel's slice...
///         Ok(())
///     }
///
///     fn write_level(&mut self, channel: MotorChannel, level: u32) -> Result<(), ()> {
///         // Write compare register...
///         Ok(())
///     }
/// }
/// ```
pub trait PwmOutput {
    /// Error type for PWM operations.
    type Error;

    /// Configure the drive signal of one channel (divider, frequency, wrap).
    fn configure(&mut self, channel: MotorChannel, timing: &PwmTiming) -> Result<(), Self::Error>;

    /// Write a discrete compare level for one channel.
    fn write_level(&mut self, channel: MotorChannel, level: u32) -> Result<(), Self::Error>;
}

/// Analog input trait for the gain potentiometer.
///
/// Implementations read a raw sample and scale it by their fixed reference
/// (e.g. `raw / 4095` for a 12-bit ADC), yielding a value in `[0, 1]`.
pub trait AnalogInput {
    /// Returns the current reading normalized to `[0, 1]`.
    fn read_normalized(&mut self) -> f32;
}

/// Raw push button level.
///
/// No debouncing is expected here; see [`crate::mode::ModeSwitch`].
pub trait ButtonInput {
    /// Returns true while the button is held down.
    fn is_pressed(&mut self) -> bool;
}

/// Button stand-in for builds without a mode button.
///
/// Never reports a press.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoButton;

impl ButtonInput for NoButton {
    fn is_pressed(&mut self) -> bool {
        false
    }
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for debouncing and capture
/// timeouts. On desktop, this can wrap `std::time::Instant`. On embedded,
/// use a hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::traits::Clock;
/// use rs_linefollow::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

#[cfg(feature = "std")]
impl Clock for std::time::Instant {
    fn now_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}
