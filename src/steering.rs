//! Proportional steering law.
//!
//! [`SteeringController::compute`] turns a line position and a gain into a
//! pair of motor duties. It is a pure function of its inputs and its fixed
//! configuration: no integral or derivative term, no memory between calls.
//!
//! # Sign Convention
//!
//! A line left of the setpoint (position < setpoint) gives a positive error,
//! which raises the left duty and lowers the right duty, turning the vehicle
//! toward the line.
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::{LinePosition, SteeringConfig, SteeringController};
//!
//! let steering = SteeringController::new(
//!     SteeringConfig::default()
//!         .with_frame_width(128)
//!         .with_base_speed(0.6)
//!         .with_motor_limits(0.0, 0.75),
//! );
//!
//! // Line 10 px left of center: error 10, turn adjust 0.05
//! let duties = steering.compute(LinePosition::new(54), 0.005);
//! assert!((duties.left - 0.65).abs() < 1e-5);
//! assert!((duties.right - 0.55).abs() < 1e-5);
//!
//! // Same offset at gain 0.5 is a turn adjust of 5.0: saturated
//! let duties = steering.compute(LinePosition::new(54), 0.5);
//! assert_eq!((duties.left, duties.right), (0.75, 0.0));
//! ```

use crate::actuation::clamp_unit;
use crate::config::SteeringConfig;

/// Horizontal pixel coordinate of the tracked line.
///
/// Nominally in `[0, frame_width)`. Values outside that range are not
/// rejected; they flow through the control law and are absorbed by clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinePosition(i32);

impl LinePosition {
    /// Wrap a pixel column.
    #[inline]
    pub const fn new(px: i32) -> Self {
        Self(px)
    }

    /// The pixel column.
    #[inline]
    pub const fn px(&self) -> i32 {
        self.0
    }
}

impl From<i32> for LinePosition {
    fn from(px: i32) -> Self {
        Self(px)
    }
}

/// Left and right motor duty cycles.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DutyPair {
    /// Left motor duty.
    pub left: f32,
    /// Right motor duty.
    pub right: f32,
}

impl DutyPair {
    /// Create a duty pair.
    #[inline]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// The same pair with left and right exchanged.
    #[inline]
    pub const fn swapped(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }
}

/// Proportional line-following controller.
///
/// Holds only immutable configuration; see the module docs for the law.
#[derive(Clone, Debug)]
pub struct SteeringController {
    config: SteeringConfig,
}

impl SteeringController {
    /// Create a controller from its configuration.
    pub fn new(config: SteeringConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Target centroid: half the frame width.
    #[inline]
    pub fn setpoint(&self) -> i32 {
        (self.config.frame_width / 2) as i32
    }

    /// `setpoint - position`, in pixels.
    #[inline]
    pub fn error(&self, position: LinePosition) -> i32 {
        self.setpoint().saturating_sub(position.px())
    }

    /// Compute the clamped left/right duties for one sample.
    ///
    /// Both outputs are always within `[motor_min, motor_max]`, including for
    /// out-of-range positions and non-finite gains.
    pub fn compute(&self, position: LinePosition, gain: f32) -> DutyPair {
        let error = self.error(position) as f32;
        let turn_adjust = gain * error;
        let left_raw = self.config.base_speed + turn_adjust;
        let right_raw = self.config.base_speed - turn_adjust;
        DutyPair {
            left: clamp_unit(left_raw, self.config.motor_min, self.config.motor_max),
            right: clamp_unit(right_raw, self.config.motor_min, self.config.motor_max),
        }
    }
}
