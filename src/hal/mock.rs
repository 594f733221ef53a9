//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every hardware trait, enabling
//! development and testing of the control loop on desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPwm`] | [`PwmOutput`] | Records configuration and every level written |
//! | [`MockCamera`] | [`FrameGrabber`] | Scripted capture latency and centroids |
//! | [`MockAnalog`] | [`AnalogInput`] | Settable knob position |
//! | [`MockButton`] | [`ButtonInput`] | Settable raw button level |
//! | [`MockClock`] | [`Clock`] | Controllable, optionally self-advancing time |
//! | [`MockDelay`] | [`DelayNs`] | Records requested delays without sleeping |
//! | [`MockDisplay`] | [`TelemetrySink`] | Keeps the rows of the last flushed frame |
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::{Config, ControlLoop};
//! use rs_linefollow::hal::{MockAnalog, MockCamera, MockClock, MockDelay, MockPwm};
//! use rs_linefollow::traits::MotorChannel;
//!
//! let mut camera = MockCamera::new();
//! camera.queue_centroid(40);
//!
//! let mut control = ControlLoop::new(
//!     Config::default(),
//!     camera,
//!     MockAnalog::new(0.0),
//!     MockPwm::new(),
//!     MockClock::new(),
//!     MockDelay::new(),
//! )
//! .unwrap();
//!
//! let report = control.iterate().unwrap();
//! assert_eq!(report.position.map(|p| p.px()), Some(40));
//! assert_eq!(control.drive().output().level(MotorChannel::Left), 7_500); // 0.6 * 12_500
//! ```
//!
//! [`PwmOutput`]: crate::traits::PwmOutput
//! [`FrameGrabber`]: crate::traits::FrameGrabber
//! [`AnalogInput`]: crate::traits::AnalogInput
//! [`ButtonInput`]: crate::traits::ButtonInput
//! [`Clock`]: crate::traits::Clock
//! [`TelemetrySink`]: crate::traits::TelemetrySink

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use embedded_hal::delay::DelayNs;

use crate::actuation::PwmTiming;
use crate::traits::{
    AnalogInput, ButtonInput, Clock, FrameGrabber, MotorChannel, PwmOutput, TelemetrySink,
};

// ============================================================================
// Actuation Mocks
// ============================================================================

/// Mock PWM peripheral for testing.
///
/// Records every `configure` and `write_level` call. Set `fail_writes` to
/// make subsequent writes return an error, or `fail_channel` to fail only one
/// motor.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::hal::MockPwm;
/// use rs_linefollow::traits::{MotorChannel, PwmOutput};
///
/// let mut pwm = MockPwm::new();
/// pwm.write_level(MotorChannel::Right, 42).unwrap();
///
/// assert_eq!(pwm.level(MotorChannel::Right), 42);
/// assert_eq!(pwm.writes, vec![(MotorChannel::Right, 42)]);
///
/// pwm.fail_writes = true;
/// assert!(pwm.write_level(MotorChannel::Right, 7).is_err());
/// assert_eq!(pwm.level(MotorChannel::Right), 42);
/// ```
#[derive(Debug, Default)]
pub struct MockPwm {
    /// Every level written, in order.
    pub writes: Vec<(MotorChannel, u32)>,
    /// Make `write_level` fail.
    pub fail_writes: bool,
    /// Make `configure` fail.
    pub fail_configure: bool,
    /// Make `write_level` fail for this channel only.
    pub fail_channel: Option<MotorChannel>,
    timings: [Option<PwmTiming>; 2],
    configure_counts: [usize; 2],
    levels: [u32; 2],
}

impl MockPwm {
    /// Creates a new mock with both channels unconfigured and at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timing the channel was last configured with.
    pub fn timing(&self, channel: MotorChannel) -> Option<PwmTiming> {
        self.timings[channel.index()]
    }

    /// Number of `configure` calls for the channel.
    pub fn configure_count(&self, channel: MotorChannel) -> usize {
        self.configure_counts[channel.index()]
    }

    /// Last level written to the channel.
    pub fn level(&self, channel: MotorChannel) -> u32 {
        self.levels[channel.index()]
    }
}

impl PwmOutput for MockPwm {
    type Error = ();

    fn configure(&mut self, channel: MotorChannel, timing: &PwmTiming) -> Result<(), ()> {
        if self.fail_configure {
            return Err(());
        }
        self.timings[channel.index()] = Some(*timing);
        self.configure_counts[channel.index()] += 1;
        Ok(())
    }

    fn write_level(&mut self, channel: MotorChannel, level: u32) -> Result<(), ()> {
        if self.fail_writes || self.fail_channel == Some(channel) {
            return Err(());
        }
        self.levels[channel.index()] = level;
        self.writes.push((channel, level));
        Ok(())
    }
}

// ============================================================================
// Sensor Mocks
// ============================================================================

/// One call made on a [`MockCamera`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraCall {
    /// `request_capture`
    RequestCapture,
    /// `is_capture_pending`
    PollPending,
    /// `decode_frame`
    DecodeFrame,
    /// `line_centroid` with its row argument
    LineCentroid(u16),
}

/// Mock frame grabber for testing.
///
/// Each capture reports pending for `pending_polls` polls before completing.
/// Queued centroids come out in FIFO order; once the queue is empty the last
/// centroid is repeated. A `stuck` camera never completes a capture.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::hal::{CameraCall, MockCamera};
/// use rs_linefollow::traits::FrameGrabber;
///
/// let mut camera = MockCamera::new().with_pending_polls(1);
/// camera.queue_centroid(25);
///
/// camera.request_capture();
/// assert!(camera.is_capture_pending());
/// assert!(!camera.is_capture_pending());
/// camera.decode_frame();
/// assert_eq!(camera.line_centroid(30), 25);
/// assert_eq!(camera.line_centroid(30), 25); // repeated
/// assert_eq!(camera.captures(), 1);
/// ```
#[derive(Debug)]
pub struct MockCamera {
    /// Every call made, in order.
    pub calls: Vec<CameraCall>,
    /// Never finish a capture while set.
    pub stuck: bool,
    pending_polls: usize,
    remaining: usize,
    centroids: VecDeque<i32>,
    last_centroid: i32,
}

impl MockCamera {
    /// Creates a camera that completes instantly and sees the line at 40 px.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            stuck: false,
            pending_polls: 0,
            remaining: 0,
            centroids: VecDeque::new(),
            last_centroid: 40,
        }
    }

    /// Report pending this many times after every capture request.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Never complete a capture.
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Queue a centroid for a later capture.
    pub fn queue_centroid(&mut self, px: i32) {
        self.centroids.push_back(px);
    }

    /// Queue several centroids.
    pub fn queue_centroids(&mut self, px: &[i32]) {
        self.centroids.extend(px.iter().copied());
    }

    /// Number of capture requests so far.
    pub fn captures(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == CameraCall::RequestCapture)
            .count()
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameGrabber for MockCamera {
    fn request_capture(&mut self) {
        self.calls.push(CameraCall::RequestCapture);
        self.remaining = self.pending_polls;
    }

    fn is_capture_pending(&mut self) -> bool {
        self.calls.push(CameraCall::PollPending);
        if self.stuck {
            return true;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return true;
        }
        false
    }

    fn decode_frame(&mut self) {
        self.calls.push(CameraCall::DecodeFrame);
    }

    fn line_centroid(&mut self, row: u16) -> i32 {
        self.calls.push(CameraCall::LineCentroid(row));
        if let Some(px) = self.centroids.pop_front() {
            self.last_centroid = px;
        }
        self.last_centroid
    }
}

/// Mock analog input for testing.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::hal::MockAnalog;
/// use rs_linefollow::traits::AnalogInput;
///
/// let mut knob = MockAnalog::new(0.25);
/// assert_eq!(knob.read_normalized(), 0.25);
///
/// knob.set(0.8);
/// assert_eq!(knob.read_normalized(), 0.8);
/// assert_eq!(knob.reads, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockAnalog {
    /// Value returned by the next read.
    pub value: f32,
    /// Number of reads so far.
    pub reads: usize,
}

impl MockAnalog {
    /// Creates a mock reading `value`.
    pub fn new(value: f32) -> Self {
        Self { value, reads: 0 }
    }

    /// Change the reading.
    pub fn set(&mut self, value: f32) {
        self.value = value;
    }
}

impl AnalogInput for MockAnalog {
    fn read_normalized(&mut self) -> f32 {
        self.reads += 1;
        self.value
    }
}

/// Mock push button for testing.
#[derive(Debug, Default)]
pub struct MockButton {
    /// Raw level returned by `is_pressed`.
    pub pressed: bool,
}

impl MockButton {
    /// Creates a released button.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw level.
    pub fn set(&mut self, pressed: bool) {
        self.pressed = pressed;
    }
}

impl ButtonInput for MockButton {
    fn is_pressed(&mut self) -> bool {
        self.pressed
    }
}

// ============================================================================
// Timing Mocks
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source. With [`with_step`](Self::with_step)
/// the clock moves forward by a fixed amount on every read, which lets
/// polling loops observe time passing.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::hal::MockClock;
/// use rs_linefollow::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
///
/// let ticking = MockClock::new().with_step(10);
/// assert_eq!(ticking.now_ms(), 0);
/// assert_eq!(ticking.now_ms(), 10);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: Cell<u64>,
    step_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
            step_ms: 0,
        }
    }

    /// Advance by `step_ms` after every read.
    pub fn with_step(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms;
        self
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms.set(ms);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms.set(self.current_ms.get() + ms);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.current_ms.get();
        self.current_ms.set(now + self.step_ms);
        now
    }
}

/// Mock delay for testing.
///
/// Returns immediately and records what was asked for.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Every `delay_ms` argument, in order.
    pub delays_ms: Vec<u32>,
    /// Sum of all requested delays in nanoseconds.
    pub total_ns: u64,
}

impl MockDelay {
    /// Creates a delay with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all requested delays in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.total_ns += ms as u64 * 1_000_000;
    }
}

// ============================================================================
// Display Mocks
// ============================================================================

/// Mock telemetry display for testing.
///
/// Rows written since the last flush are kept as pending; `flush` makes them
/// the visible frame.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::hal::MockDisplay;
/// use rs_linefollow::traits::TelemetrySink;
///
/// let mut display = MockDisplay::new();
/// display.write_row(0, "Line COM").unwrap();
/// display.write_row(1, "COM: 40").unwrap();
/// assert!(display.visible_rows().is_empty());
///
/// display.flush().unwrap();
/// assert_eq!(display.visible_rows(), vec!["Line COM", "COM: 40"]);
/// assert_eq!(display.flush_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Successful flushes so far.
    pub flush_count: usize,
    /// Make every call return an error.
    pub fail: bool,
    pending: Vec<String>,
    visible: Vec<String>,
    #[cfg(feature = "std")]
    gate: Option<std::sync::mpsc::Receiver<()>>,
}

impl MockDisplay {
    /// Creates an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Block each flush until a token arrives on `gate` (or its sender is
    /// gone). Simulates a slow panel.
    #[cfg(feature = "std")]
    pub fn blocking_flush(mut self, gate: std::sync::mpsc::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Rows of the last flushed frame.
    pub fn visible_rows(&self) -> Vec<&str> {
        self.visible.iter().map(String::as_str).collect()
    }
}

impl TelemetrySink for MockDisplay {
    type Error = ();

    fn write_row(&mut self, row: usize, text: &str) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        if self.pending.len() <= row {
            self.pending.resize(row + 1, String::new());
        }
        self.pending[row] = String::from(text);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        #[cfg(feature = "std")]
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.visible = core::mem::take(&mut self.pending);
        self.flush_count += 1;
        Ok(())
    }
}
