//! # rs-linefollow
//!
//! Closed-loop controller for a two-wheeled, camera-guided line-following
//! robot: a camera reports where a dark line sits on one scan row, a
//! proportional law turns that offset into left and right motor duties, and
//! two PWM channels drive the motors.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for the camera, motor PWM, gain knob, mode button and display
//! - **Proportional steering**: Pure, clamped, deterministic control law
//! - **Cached PWM resolution**: Computed once per channel, never recomputed in the loop
//! - **Bounded capture wait**: Optional timeout with a stop-or-hold fallback
//! - **Telemetry pages**: Debounced button rotates what the display shows
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions
//! - `sensor` - Line position and gain readers
//! - `steering` - The proportional control law
//! - `actuation` - Duty cycles to PWM levels
//! - `follower` - The control loop that ties everything together
//! - `mode` / `telemetry` - Status display, off the actuation path
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_linefollow::{
//!     Config, ControlLoop,
//!     hal::{MockAnalog, MockCamera, MockClock, MockDelay, MockPwm},
//! };
//!
//! let mut camera = MockCamera::new();
//! camera.queue_centroids(&[40, 30, 50]);
//!
//! let mut control = ControlLoop::new(
//!     Config::default(),
//!     camera,
//!     MockAnalog::new(0.02),
//!     MockPwm::new(),
//!     MockClock::new(),
//!     MockDelay::new(),
//! )
//! .unwrap();
//!
//! let straight = control.iterate().unwrap();
//! assert_eq!(straight.duties.left, straight.duties.right);
//!
//! let left_turn = control.iterate().unwrap(); // line left of center
//! assert!(left_turn.duties.left > left_turn.duties.right);
//!
//! let right_turn = control.iterate().unwrap();
//! assert!(right_turn.duties.left < right_turn.duties.right);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Duty cycles to discrete PWM levels.
pub mod actuation;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// The sense/compute/actuate control loop.
pub mod follower;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Debounced mode button and telemetry pages.
pub mod mode;
/// Line position and gain readers.
pub mod sensor;
/// Proportional steering law.
pub mod steering;
/// Telemetry row formatting and publishing.
pub mod telemetry;
/// Core traits for hardware abstraction.
pub mod traits;

// Re-exports for convenience
pub use actuation::{DriveTrain, PwmChannel, PwmTiming};
pub use follower::{ControlLoop, IterationReport, LoopError, LoopState, SensorOutcome};
pub use mode::{ModeSwitch, TelemetryPage};
pub use sensor::{CaptureTimeout, GainKnob, GainReading, LineSensor};
pub use steering::{DutyPair, LinePosition, SteeringController};
pub use telemetry::{Telemetry, TelemetrySnapshot};
pub use traits::{
    AnalogInput, ButtonInput, Clock, FrameGrabber, MotorChannel, NoButton, NullSink, PwmOutput,
    TelemetrySink,
};

// Config re-exports
pub use config::{
    Config, ConfigError, DeviceConfig, GainConfig, LoopConfig, PwmConfig, SensorConfig,
    StallPolicy, SteeringConfig, TelemetryConfig,
};
