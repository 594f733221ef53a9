//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Defaults are the values the robot
//! was tuned with: an 80x60 camera frame scanned on its middle row, 60% base
//! speed, motors capped at 75% and a 100 ms loop period.
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::config::{Config, LoopConfig, SteeringConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_frame(128, 96)
//!     .with_steering(SteeringConfig::default().with_base_speed(0.55))
//!     .with_loop(LoopConfig::default().with_period_ms(20));
//! assert_eq!(config.steering.frame_width, 128);
//! assert_eq!(config.sensor.scan_row, 48);
//! ```

use core::fmt;

use heapless::String as HString;

use crate::actuation::PwmTiming;
use crate::mode::TelemetryPage;

/// Maximum length for short config strings (device names)
pub const MAX_SHORT_STRING: usize = 32;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= MAX_SHORT_STRING)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON blob could not be parsed into a [`Config`].
    Parse,
    /// Motor limits are inverted or outside `[0, 1]`.
    MotorLimits,
    /// Frame dimensions are zero or the scan row lies outside the frame.
    Frame,
    /// The gain scale is negative or not finite.
    GainScale,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse => f.write_str("malformed configuration JSON"),
            ConfigError::MotorLimits => {
                f.write_str("motor limits must satisfy 0 <= min <= max <= 1")
            }
            ConfigError::Frame => f.write_str("frame is empty or scan row is outside it"),
            ConfigError::GainScale => f.write_str("gain scale must be finite and non-negative"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Proportional steering law
    pub steering: SteeringConfig,
    /// Motor PWM generation
    pub pwm: PwmConfig,
    /// Gain potentiometer scaling
    pub gain: GainConfig,
    /// Camera sampling and stall handling
    pub sensor: SensorConfig,
    /// Loop cadence
    pub control_loop: LoopConfig,
    /// Display pages and mode button
    pub telemetry: TelemetryConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set the camera frame size.
    ///
    /// The setpoint follows the width; the scan row becomes the middle row.
    pub fn with_frame(mut self, width: u16, height: u16) -> Self {
        self.steering.frame_width = width;
        self.sensor.scan_row = height / 2;
        self.sensor.frame_height = height;
        self
    }

    /// Set steering configuration.
    ///
    /// The frame width belongs to the frame geometry set by
    /// [`with_frame`](Self::with_frame) and is kept, so the two calls can come
    /// in either order.
    pub fn with_steering(mut self, steering: SteeringConfig) -> Self {
        let frame_width = self.steering.frame_width;
        self.steering = steering;
        self.steering.frame_width = frame_width;
        self
    }

    /// Set PWM configuration
    pub fn with_pwm(mut self, pwm: PwmConfig) -> Self {
        self.pwm = pwm;
        self
    }

    /// Set gain configuration
    pub fn with_gain(mut self, gain: GainConfig) -> Self {
        self.gain = gain;
        self
    }

    /// Set sensor configuration
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Set loop configuration
    pub fn with_loop(mut self, control_loop: LoopConfig) -> Self {
        self.control_loop = control_loop;
        self
    }

    /// Set telemetry configuration
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Duty ceiling applied by the PWM channels.
    ///
    /// The lower of the hardware ceiling and the steering `motor_max`, so the
    /// actuation layer enforces the same limit as the control law.
    pub fn duty_ceiling(&self) -> f32 {
        self.pwm.duty_ceiling.min(self.steering.motor_max)
    }

    /// Check cross-field constraints that builders cannot enforce alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.steering;
        if !(0.0..=1.0).contains(&s.motor_min)
            || !(0.0..=1.0).contains(&s.motor_max)
            || s.motor_min > s.motor_max
        {
            return Err(ConfigError::MotorLimits);
        }
        if s.frame_width == 0
            || self.sensor.frame_height == 0
            || self.sensor.scan_row >= self.sensor.frame_height
        {
            return Err(ConfigError::Frame);
        }
        let scale = self.gain.gain_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::GainScale);
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON configuration.
    ///
    /// Missing fields keep their defaults.
    ///
    /// ```
    /// use rs_linefollow::Config;
    ///
    /// let config = Config::from_json(br#"{"steering":{"base_speed":0.5}}"#).unwrap();
    /// assert_eq!(config.steering.base_speed, 0.5);
    /// assert_eq!(config.steering.motor_max, 0.75);
    /// ```
    #[cfg(feature = "serde-json-core")]
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let (config, _): (Config, usize) =
            serde_json_core::from_slice(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Steering Config
// ============================================================================

/// Proportional steering law configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SteeringConfig {
    /// Camera frame width in pixels; the setpoint is half of it
    pub frame_width: u16,
    /// Duty applied to both motors when the line is centered
    pub base_speed: f32,
    /// Lowest duty either motor may receive
    pub motor_min: f32,
    /// Highest duty either motor may receive
    pub motor_max: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            frame_width: 80,
            base_speed: 0.6,
            motor_min: 0.0,
            motor_max: 0.75,
        }
    }
}

impl SteeringConfig {
    /// Set the frame width (at least 1 pixel)
    pub fn with_frame_width(mut self, width: u16) -> Self {
        self.frame_width = width.max(1);
        self
    }

    /// Set the base speed
    pub fn with_base_speed(mut self, speed: f32) -> Self {
        self.base_speed = speed.clamp(0.0, 1.0);
        self
    }

    /// Set the motor duty limits.
    ///
    /// Both are clamped to `[0, 1]`; if `min > max` they are swapped.
    pub fn with_motor_limits(mut self, min: f32, max: f32) -> Self {
        let min = min.clamp(0.0, 1.0);
        let max = max.clamp(0.0, 1.0);
        if min <= max {
            self.motor_min = min;
            self.motor_max = max;
        } else {
            self.motor_min = max;
            self.motor_max = min;
        }
        self
    }
}

// ============================================================================
// PWM Config
// ============================================================================

/// Motor PWM configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PwmConfig {
    /// Clock, divider and frequency of both channels
    pub timing: PwmTiming,
    /// Hardware duty ceiling (0.0 to 1.0)
    pub duty_ceiling: f32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            timing: PwmTiming::default(),
            duty_ceiling: 1.0,
        }
    }
}

impl PwmConfig {
    /// Set the PWM timing
    pub fn with_timing(mut self, timing: PwmTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set the hardware duty ceiling
    pub fn with_duty_ceiling(mut self, ceiling: f32) -> Self {
        self.duty_ceiling = ceiling.clamp(0.0, 1.0);
        self
    }
}

// ============================================================================
// Gain Config
// ============================================================================

/// Gain potentiometer configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GainConfig {
    /// ADC reference voltage, used for display only
    pub reference_volts: f32,
    /// Gain at full knob travel
    pub gain_scale: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            reference_volts: 3.3,
            gain_scale: 0.5,
        }
    }
}

impl GainConfig {
    /// Set the reference voltage
    pub fn with_reference_volts(mut self, volts: f32) -> Self {
        self.reference_volts = volts;
        self
    }

    /// Set the full-scale gain (negative or NaN becomes 0)
    pub fn with_gain_scale(mut self, scale: f32) -> Self {
        self.gain_scale = if scale.is_nan() { 0.0 } else { scale.max(0.0) };
        self
    }
}

// ============================================================================
// Sensor Config
// ============================================================================

/// What the loop does with the motors when a capture times out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StallPolicy {
    /// Drive both motors to zero.
    #[default]
    StopMotors,
    /// Keep the last commanded duties.
    HoldLast,
}

/// Camera sampling configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Frame height in pixels
    pub frame_height: u16,
    /// Row queried for the line centroid
    pub scan_row: u16,
    /// Bounded wait for capture completion (`None` waits forever)
    pub capture_timeout_ms: Option<u32>,
    /// Fallback applied when the bounded wait expires
    pub stall_policy: StallPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            frame_height: 60,
            scan_row: 30,
            capture_timeout_ms: None,
            stall_policy: StallPolicy::StopMotors,
        }
    }
}

impl SensorConfig {
    /// Set the scan row (clamped into the frame)
    pub fn with_scan_row(mut self, row: u16) -> Self {
        self.scan_row = row.min(self.frame_height.saturating_sub(1));
        self
    }

    /// Bound the capture wait
    pub fn with_capture_timeout_ms(mut self, ms: u32) -> Self {
        self.capture_timeout_ms = Some(ms);
        self
    }

    /// Wait for captures without bound
    pub fn without_capture_timeout(mut self) -> Self {
        self.capture_timeout_ms = None;
        self
    }

    /// Set the stall fallback
    pub fn with_stall_policy(mut self, policy: StallPolicy) -> Self {
        self.stall_policy = policy;
        self
    }
}

// ============================================================================
// Loop Config
// ============================================================================

/// Control loop cadence
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopConfig {
    /// Fixed delay at the end of each iteration, in milliseconds
    pub period_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { period_ms: 100 }
    }
}

impl LoopConfig {
    /// Set the end-of-iteration delay
    pub fn with_period_ms(mut self, ms: u32) -> Self {
        self.period_ms = ms;
        self
    }
}

// ============================================================================
// Telemetry Config
// ============================================================================

/// Display pages and mode button configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TelemetryConfig {
    /// Whether rows are rendered at all
    pub enabled: bool,
    /// Page shown after boot
    pub initial_page: TelemetryPage,
    /// Mode button debounce interval in milliseconds
    pub debounce_ms: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_page: TelemetryPage::Overview,
            debounce_ms: 50,
        }
    }
}

impl TelemetryConfig {
    /// Enable or disable rendering
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the boot page
    pub fn with_initial_page(mut self, page: TelemetryPage) -> Self {
        self.initial_page = page;
        self
    }

    /// Set the debounce interval
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Name shown on the splash screen
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("rs-linefollow"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.steering.frame_width, 80);
        assert_eq!(config.steering.base_speed, 0.6);
        assert_eq!(config.steering.motor_min, 0.0);
        assert_eq!(config.steering.motor_max, 0.75);
        assert_eq!(config.sensor.scan_row, 30);
        assert_eq!(config.control_loop.period_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn with_frame_updates_setpoint_and_scan_row() {
        let config = Config::default().with_frame(128, 64);
        assert_eq!(config.steering.frame_width, 128);
        assert_eq!(config.sensor.frame_height, 64);
        assert_eq!(config.sensor.scan_row, 32);
    }

    #[test]
    fn frame_survives_steering_in_either_order() {
        let steering = SteeringConfig::default().with_base_speed(0.55);
        let frame_first = Config::default()
            .with_frame(128, 96)
            .with_steering(steering.clone());
        let steering_first = Config::default()
            .with_steering(steering)
            .with_frame(128, 96);

        assert_eq!(frame_first.steering, steering_first.steering);
        assert_eq!(frame_first.sensor, steering_first.sensor);
        assert_eq!(frame_first.steering.frame_width, 128);
        assert_eq!(frame_first.steering.base_speed, 0.55);
        assert_eq!(frame_first.sensor.scan_row, 48);
        assert!(frame_first.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_gain_scale() {
        for scale in [-0.5, f32::NAN, f32::INFINITY] {
            let mut config = Config::default();
            config.gain.gain_scale = scale;
            assert_eq!(config.validate(), Err(ConfigError::GainScale));
        }
    }

    #[test]
    fn gain_scale_builder_clamps() {
        assert_eq!(GainConfig::default().with_gain_scale(-2.0).gain_scale, 0.0);
        assert_eq!(GainConfig::default().with_gain_scale(f32::NAN).gain_scale, 0.0);
        assert_eq!(GainConfig::default().with_gain_scale(2.0).gain_scale, 2.0);
    }

    #[test]
    fn duty_ceiling_takes_lower_limit() {
        let config = Config::default();
        assert_eq!(config.duty_ceiling(), 0.75);

        let config = Config::default().with_pwm(PwmConfig::default().with_duty_ceiling(0.5));
        assert_eq!(config.duty_ceiling(), 0.5);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_steering(SteeringConfig::default().with_base_speed(0.55))
            .with_gain(GainConfig::default().with_gain_scale(10.0))
            .with_loop(LoopConfig::default().with_period_ms(20))
            .with_device(DeviceConfig::default().with_name("Cup Racer"));

        assert_eq!(config.steering.base_speed, 0.55);
        assert_eq!(config.gain.gain_scale, 10.0);
        assert_eq!(config.control_loop.period_ms, 20);
        assert_eq!(config.device.name.as_str(), "Cup Racer");
    }

    // =========================================================================
    // SteeringConfig Tests
    // =========================================================================

    #[test]
    fn motor_limits_clamped() {
        let s = SteeringConfig::default().with_motor_limits(-0.5, 1.5);
        assert_eq!(s.motor_min, 0.0);
        assert_eq!(s.motor_max, 1.0);
    }

    #[test]
    fn motor_limits_swapped_when_inverted() {
        let s = SteeringConfig::default().with_motor_limits(0.8, 0.2);
        assert_eq!(s.motor_min, 0.2);
        assert_eq!(s.motor_max, 0.8);
    }

    #[test]
    fn base_speed_clamped() {
        assert_eq!(SteeringConfig::default().with_base_speed(2.0).base_speed, 1.0);
        assert_eq!(SteeringConfig::default().with_base_speed(-1.0).base_speed, 0.0);
    }

    #[test]
    fn zero_frame_width_raised() {
        assert_eq!(SteeringConfig::default().with_frame_width(0).frame_width, 1);
    }

    // =========================================================================
    // SensorConfig Tests
    // =========================================================================

    #[test]
    fn sensor_default_waits_forever() {
        let sensor = SensorConfig::default();
        assert_eq!(sensor.capture_timeout_ms, None);
        assert_eq!(sensor.stall_policy, StallPolicy::StopMotors);
    }

    #[test]
    fn sensor_builder() {
        let sensor = SensorConfig::default()
            .with_capture_timeout_ms(250)
            .with_stall_policy(StallPolicy::HoldLast)
            .with_scan_row(500);
        assert_eq!(sensor.capture_timeout_ms, Some(250));
        assert_eq!(sensor.stall_policy, StallPolicy::HoldLast);
        assert_eq!(sensor.scan_row, 59);

        let sensor = sensor.without_capture_timeout();
        assert_eq!(sensor.capture_timeout_ms, None);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn validate_rejects_inverted_limits() {
        let mut config = Config::default();
        config.steering.motor_min = 0.9;
        config.steering.motor_max = 0.1;
        assert_eq!(config.validate(), Err(ConfigError::MotorLimits));
    }

    #[test]
    fn validate_rejects_scan_row_outside_frame() {
        let mut config = Config::default();
        config.sensor.scan_row = 60;
        assert_eq!(config.validate(), Err(ConfigError::Frame));
    }

    #[test]
    fn config_error_display() {
        assert_eq!(ConfigError::Parse.to_string(), "malformed configuration JSON");
    }

    // =========================================================================
    // TelemetryConfig / DeviceConfig Tests
    // =========================================================================

    #[test]
    fn telemetry_config_default() {
        let t = TelemetryConfig::default();
        assert!(t.enabled);
        assert_eq!(t.initial_page, TelemetryPage::Overview);
        assert_eq!(t.debounce_ms, 50);
    }

    #[test]
    fn device_config_default() {
        assert_eq!(DeviceConfig::default().name.as_str(), "rs-linefollow");
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        // 9 four-byte characters: only 8 fit in 32 bytes
        let input = "\u{1F697}".repeat(9);
        let s = short_string(&input);
        assert_eq!(s.len(), 32);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    // =========================================================================
    // JSON Tests
    // =========================================================================

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn from_json_partial() {
        let json = br#"{
            "sensor": {"capture_timeout_ms": 200, "stall_policy": "hold_last"},
            "control_loop": {"period_ms": 20}
        }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.sensor.capture_timeout_ms, Some(200));
        assert_eq!(config.sensor.stall_policy, StallPolicy::HoldLast);
        assert_eq!(config.control_loop.period_ms, 20);
        assert_eq!(config.steering.base_speed, 0.6);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn from_json_rejects_garbage() {
        assert_eq!(Config::from_json(b"{not json").unwrap_err(), ConfigError::Parse);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn from_json_validates() {
        let json = br#"{"steering":{"motor_min":0.9,"motor_max":0.1}}"#;
        assert_eq!(Config::from_json(json).unwrap_err(), ConfigError::MotorLimits);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn from_json_rejects_negative_gain_scale() {
        let json = br#"{"gain":{"gain_scale":-0.5}}"#;
        assert_eq!(Config::from_json(json).unwrap_err(), ConfigError::GainScale);
    }
}
