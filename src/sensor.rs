//! Sensor adapters: line position from the camera, gain from the knob.
//!
//! [`LineSensor`] hides the capture/poll/decode/query handshake of a
//! [`FrameGrabber`] behind one synchronous call. [`GainKnob`] turns a
//! normalized analog reading into the proportional gain.
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::sensor::LineSensor;
//! use rs_linefollow::hal::MockCamera;
//!
//! let mut camera = MockCamera::new();
//! camera.queue_centroid(37);
//!
//! let mut sensor = LineSensor::new(camera, 30);
//! assert_eq!(sensor.read_line_position().px(), 37);
//! ```

use core::fmt;

use crate::config::GainConfig;
use crate::steering::LinePosition;
use crate::traits::{AnalogInput, Clock, FrameGrabber};

/// A bounded capture wait expired before the frame completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureTimeout {
    /// Time spent polling, in milliseconds.
    pub waited_ms: u64,
}

impl fmt::Display for CaptureTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame capture still pending after {} ms", self.waited_ms)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CaptureTimeout {}

/// Synchronous line position reader over a frame grabber.
pub struct LineSensor<F: FrameGrabber> {
    camera: F,
    scan_row: u16,
}

impl<F: FrameGrabber> LineSensor<F> {
    /// Wrap a frame grabber; centroids are taken on `scan_row`.
    pub fn new(camera: F, scan_row: u16) -> Self {
        Self { camera, scan_row }
    }

    /// Row the centroid is taken on.
    #[inline]
    pub fn scan_row(&self) -> u16 {
        self.scan_row
    }

    /// Capture a frame and return the line centroid on the scan row.
    ///
    /// Busy-polls until the camera reports completion. There is no timeout:
    /// if the camera never completes, this never returns.
    pub fn read_line_position(&mut self) -> LinePosition {
        self.camera.request_capture();
        while self.camera.is_capture_pending() {
            core::hint::spin_loop();
        }
        self.finish()
    }

    /// Like [`read_line_position`](Self::read_line_position) but gives up
    /// after `timeout_ms` as measured by `clock`.
    ///
    /// On timeout the frame is not decoded and no centroid is queried.
    pub fn read_line_position_within<K: Clock>(
        &mut self,
        timeout_ms: u32,
        clock: &K,
    ) -> Result<LinePosition, CaptureTimeout> {
        let start = clock.now_ms();
        self.camera.request_capture();
        while self.camera.is_capture_pending() {
            let waited_ms = clock.now_ms().saturating_sub(start);
            if waited_ms >= timeout_ms as u64 {
                return Err(CaptureTimeout { waited_ms });
            }
            core::hint::spin_loop();
        }
        Ok(self.finish())
    }

    fn finish(&mut self) -> LinePosition {
        self.camera.decode_frame();
        LinePosition::new(self.camera.line_centroid(self.scan_row))
    }

    /// Borrow the camera.
    pub fn camera(&self) -> &F {
        &self.camera
    }

    /// Mutably borrow the camera.
    pub fn camera_mut(&mut self) -> &mut F {
        &mut self.camera
    }
}

/// One sample of the gain knob.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GainReading {
    /// Knob position in `[0, 1]`.
    pub normalized: f32,
    /// Equivalent input voltage.
    pub volts: f32,
    /// Proportional gain derived from the position.
    pub gain: f32,
}

/// Gain potentiometer adapter.
///
/// ```rust
/// use rs_linefollow::sensor::GainKnob;
/// use rs_linefollow::config::GainConfig;
/// use rs_linefollow::hal::MockAnalog;
///
/// let mut knob = GainKnob::new(MockAnalog::new(0.5), GainConfig::default());
/// let reading = knob.read();
/// assert!((reading.volts - 1.65).abs() < 1e-5);
/// assert!((reading.gain - 0.25).abs() < 1e-6);
/// ```
pub struct GainKnob<A: AnalogInput> {
    input: A,
    config: GainConfig,
}

impl<A: AnalogInput> GainKnob<A> {
    /// Wrap an analog input with its scaling.
    pub fn new(input: A, config: GainConfig) -> Self {
        Self { input, config }
    }

    /// Sample the knob. Readings outside `[0, 1]` are clamped; NaN reads as 0.
    pub fn read(&mut self) -> GainReading {
        let raw = self.input.read_normalized();
        let normalized = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        GainReading {
            normalized,
            volts: normalized * self.config.reference_volts,
            gain: normalized * self.config.gain_scale,
        }
    }

    /// Mutably borrow the analog input.
    pub fn input_mut(&mut self) -> &mut A {
        &mut self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{CameraCall, MockAnalog, MockCamera, MockClock};

    #[test]
    fn read_follows_handshake_order() {
        let mut camera = MockCamera::new().with_pending_polls(3);
        camera.queue_centroid(12);
        let mut sensor = LineSensor::new(camera, 30);

        assert_eq!(sensor.read_line_position(), LinePosition::new(12));
        assert_eq!(
            sensor.camera().calls,
            vec![
                CameraCall::RequestCapture,
                CameraCall::PollPending,
                CameraCall::PollPending,
                CameraCall::PollPending,
                CameraCall::PollPending,
                CameraCall::DecodeFrame,
                CameraCall::LineCentroid(30),
            ]
        );
    }

    #[test]
    fn out_of_range_centroid_is_passed_through() {
        let mut camera = MockCamera::new();
        camera.queue_centroid(-7);
        let mut sensor = LineSensor::new(camera, 30);
        assert_eq!(sensor.read_line_position().px(), -7);
    }

    #[test]
    fn bounded_read_succeeds_in_time() {
        let mut camera = MockCamera::new().with_pending_polls(2);
        camera.queue_centroid(44);
        let mut sensor = LineSensor::new(camera, 30);
        let clock = MockClock::new().with_step(1);

        assert_eq!(
            sensor.read_line_position_within(100, &clock),
            Ok(LinePosition::new(44))
        );
    }

    #[test]
    fn bounded_read_times_out_without_decoding() {
        let camera = MockCamera::new().stuck();
        let mut sensor = LineSensor::new(camera, 30);
        let clock = MockClock::new().with_step(10);

        let err = sensor.read_line_position_within(50, &clock).unwrap_err();
        assert!(err.waited_ms >= 50);
        assert!(!sensor.camera().calls.contains(&CameraCall::DecodeFrame));
    }

    #[test]
    fn capture_timeout_display() {
        let err = CaptureTimeout { waited_ms: 120 };
        assert_eq!(err.to_string(), "frame capture still pending after 120 ms");
    }

    #[test]
    fn knob_scales_reading() {
        let mut knob = GainKnob::new(
            MockAnalog::new(1.0),
            GainConfig::default().with_gain_scale(10.0),
        );
        let r = knob.read();
        assert_eq!(r.normalized, 1.0);
        assert!((r.volts - 3.3).abs() < 1e-6);
        assert_eq!(r.gain, 10.0);
    }

    #[test]
    fn knob_clamps_out_of_range() {
        let mut knob = GainKnob::new(MockAnalog::new(1.7), GainConfig::default());
        assert_eq!(knob.read().normalized, 1.0);

        knob.input_mut().set(-0.2);
        assert_eq!(knob.read().gain, 0.0);

        knob.input_mut().set(f32::NAN);
        assert_eq!(knob.read().gain, 0.0);
    }
}
