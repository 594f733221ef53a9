//! Trait definitions for the collaborators the control loop talks to.
//!
//! This module defines the seams that allow rs-linefollow to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Swap the camera pipeline without touching the control law
//! - Render telemetry on any text-capable display
//!
//! # Submodules
//!
//! - `hardware`: PWM output, analog knob, button, clock
//! - `camera`: Frame acquisition and line centroid extraction
//! - `display`: Telemetry sink
//!
//! # Hardware Abstraction
//!
//! The key traits are:
//!
//! - [`PwmOutput`]: Two-channel PWM motor drive
//! - [`FrameGrabber`]: Camera capture and centroid query
//! - [`AnalogInput`]: Normalized gain potentiometer
//! - [`ButtonInput`]: Raw mode button level
//! - [`TelemetrySink`]: Text rows plus refresh
//! - [`Clock`]: Time source for `no_std` environments

pub mod camera;
pub mod display;
pub mod hardware;

pub use camera::*;
pub use display::*;
pub use hardware::*;
