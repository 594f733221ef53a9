//! Actuation layer: normalized duty cycles to discrete PWM levels.
//!
//! Each motor channel is driven by a periodic signal whose resolution (the
//! counter "wrap") follows from three fixed constants: source clock, clock
//! divider and target frequency. The wrap is computed once in
//! [`PwmChannel::init`] and kept in the channel struct, which is then passed
//! to every [`PwmChannel::set_duty`] call.
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::actuation::{DriveTrain, PwmTiming};
//! use rs_linefollow::hal::MockPwm;
//! use rs_linefollow::{DutyPair, MotorChannel};
//!
//! let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 0.75).unwrap();
//! assert_eq!(drive.channel(MotorChannel::Left).wrap(), 12_499);
//!
//! drive.set_duties(DutyPair::new(0.5, 2.0)).unwrap();
//! assert_eq!(drive.output().level(MotorChannel::Left), 6_250);
//! assert_eq!(drive.output().level(MotorChannel::Right), 9_375); // clamped to 0.75
//! ```

use crate::steering::DutyPair;
use crate::traits::{MotorChannel, PwmOutput};

/// Clamp a duty cycle into `[0, ceiling]`, mapping NaN to zero.
#[inline]
pub(crate) fn clamp_unit(duty: f32, low: f32, high: f32) -> f32 {
    if duty.is_nan() {
        low
    } else {
        duty.clamp(low, high)
    }
}

/// Fixed timing constants of a PWM channel.
///
/// The defaults describe a 125 MHz source clock, no division and a 10 kHz
/// drive frequency, giving 12 500 discrete duty levels.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PwmTiming {
    /// Peripheral source clock in Hz.
    pub source_clock_hz: u32,
    /// Fractional clock divider (>= 1.0).
    pub clock_divider: f32,
    /// Target drive frequency in Hz.
    pub frequency_hz: u32,
}

impl Default for PwmTiming {
    fn default() -> Self {
        Self {
            source_clock_hz: 125_000_000,
            clock_divider: 1.0,
            frequency_hz: 10_000,
        }
    }
}

impl PwmTiming {
    /// Set the source clock
    pub fn with_source_clock_hz(mut self, hz: u32) -> Self {
        self.source_clock_hz = hz;
        self
    }

    /// Set the clock divider (values below 1.0 are raised to 1.0)
    pub fn with_clock_divider(mut self, divider: f32) -> Self {
        self.clock_divider = if divider.is_nan() { 1.0 } else { divider.max(1.0) };
        self
    }

    /// Set the drive frequency (at least 1 Hz)
    pub fn with_frequency_hz(mut self, hz: u32) -> Self {
        self.frequency_hz = hz.max(1);
        self
    }

    /// Counter top value: `clock / (divider * frequency) - 1`.
    ///
    /// Saturates at `u16::MAX` since the counter is 16 bits wide, and never
    /// drops below 1.
    ///
    /// ```
    /// use rs_linefollow::actuation::PwmTiming;
    ///
    /// assert_eq!(PwmTiming::default().wrap(), 12_499);
    /// assert_eq!(PwmTiming::default().with_frequency_hz(20_000).wrap(), 6_249);
    /// ```
    pub fn wrap(&self) -> u32 {
        let divider = if self.clock_divider.is_nan() || self.clock_divider < 1.0 {
            1.0
        } else {
            self.clock_divider
        };
        let frequency = self.frequency_hz.max(1) as f32;
        let counts = (self.source_clock_hz as f32 / (divider * frequency)) as u32;
        counts.saturating_sub(1).clamp(1, u16::MAX as u32)
    }
}

/// One initialized motor channel.
///
/// Holds the channel's precomputed resolution and its amplitude ceiling.
/// Construct with [`PwmChannel::init`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PwmChannel {
    id: MotorChannel,
    wrap: u32,
    ceiling: f32,
    duty: f32,
    level: u32,
}

impl PwmChannel {
    /// Configures the hardware channel and computes its wrap.
    ///
    /// `ceiling` is the highest duty this channel will ever output; it is
    /// clamped into `[0, 1]`. Calling `init` again with the same arguments
    /// produces an identical channel.
    pub fn init<P: PwmOutput>(
        output: &mut P,
        id: MotorChannel,
        timing: &PwmTiming,
        ceiling: f32,
    ) -> Result<Self, P::Error> {
        output.configure(id, timing)?;
        Ok(Self {
            id,
            wrap: timing.wrap(),
            ceiling: clamp_unit(ceiling, 0.0, 1.0),
            duty: 0.0,
            level: 0,
        })
    }

    /// Which motor this channel drives.
    #[inline]
    pub fn id(&self) -> MotorChannel {
        self.id
    }

    /// Cached counter top value.
    #[inline]
    pub fn wrap(&self) -> u32 {
        self.wrap
    }

    /// Highest duty this channel will output.
    #[inline]
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Last duty written (after clamping).
    #[inline]
    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Last level written.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Discrete level for a duty cycle, after clamping to `[0, ceiling]`.
    ///
    /// ```
    /// use rs_linefollow::actuation::{PwmChannel, PwmTiming};
    /// use rs_linefollow::hal::MockPwm;
    /// use rs_linefollow::MotorChannel;
    ///
    /// let mut pwm = MockPwm::new();
    /// let timing = PwmTiming::default();
    /// let ch = PwmChannel::init(&mut pwm, MotorChannel::Left, &timing, 1.0).unwrap();
    /// assert_eq!(ch.level_for(0.0), 0);
    /// assert_eq!(ch.level_for(1.0), 12_500);
    /// assert_eq!(ch.level_for(-3.0), 0);
    /// ```
    pub fn level_for(&self, duty: f32) -> u32 {
        let duty = clamp_unit(duty, 0.0, self.ceiling);
        (duty * (self.wrap + 1) as f32) as u32
    }

    /// Clamp, scale and write one duty cycle.
    ///
    /// Out-of-range input is clamped, never rejected. The level goes out in a
    /// single `write_level` call. Returns the level written.
    pub fn set_duty<P: PwmOutput>(&mut self, output: &mut P, duty: f32) -> Result<u32, P::Error> {
        let duty = clamp_unit(duty, 0.0, self.ceiling);
        let level = self.level_for(duty);
        output.write_level(self.id, level)?;
        self.duty = duty;
        self.level = level;
        Ok(level)
    }
}

/// Both drive channels plus the PWM peripheral that feeds them.
///
/// The only persistent mutable state of the control core lives here: the two
/// last-written duties and the cached channel resolutions.
pub struct DriveTrain<P: PwmOutput> {
    output: P,
    channels: [PwmChannel; 2],
}

impl<P: PwmOutput> DriveTrain<P> {
    /// Initializes both channels with the same timing and ceiling.
    ///
    /// Both outputs are driven to zero before returning.
    pub fn new(mut output: P, timing: PwmTiming, ceiling: f32) -> Result<Self, P::Error> {
        let left = PwmChannel::init(&mut output, MotorChannel::Left, &timing, ceiling)?;
        let right = PwmChannel::init(&mut output, MotorChannel::Right, &timing, ceiling)?;
        let mut drive = Self {
            output,
            channels: [left, right],
        };
        drive.stop()?;
        Ok(drive)
    }

    /// Writes one duty to one channel. Returns the level written.
    pub fn set_duty(&mut self, channel: MotorChannel, duty: f32) -> Result<u32, P::Error> {
        self.channels[channel.index()].set_duty(&mut self.output, duty)
    }

    /// Writes a duty pair, left first.
    ///
    /// The right channel is written even when the left write fails; the first
    /// error is returned afterwards.
    pub fn set_duties(&mut self, duties: DutyPair) -> Result<(u32, u32), P::Error> {
        let left = self.set_duty(MotorChannel::Left, duties.left);
        let right = self.set_duty(MotorChannel::Right, duties.right);
        Ok((left?, right?))
    }

    /// Re-writes the last commanded duties.
    pub fn hold(&mut self) -> Result<(u32, u32), P::Error> {
        let last = self.duties();
        self.set_duties(last)
    }

    /// Drives both channels to zero.
    pub fn stop(&mut self) -> Result<(u32, u32), P::Error> {
        self.set_duties(DutyPair::new(0.0, 0.0))
    }

    /// Last duties written (after clamping).
    pub fn duties(&self) -> DutyPair {
        DutyPair::new(self.channels[0].duty(), self.channels[1].duty())
    }

    /// Last levels written, `(left, right)`.
    pub fn levels(&self) -> (u32, u32) {
        (self.channels[0].level(), self.channels[1].level())
    }

    /// Channel state for one motor.
    pub fn channel(&self, channel: MotorChannel) -> &PwmChannel {
        &self.channels[channel.index()]
    }

    /// Borrow the PWM peripheral.
    pub fn output(&self) -> &P {
        &self.output
    }

    /// Mutably borrow the PWM peripheral.
    pub fn output_mut(&mut self) -> &mut P {
        &mut self.output
    }

    /// Give back the PWM peripheral.
    pub fn into_output(self) -> P {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockPwm;

    fn channel(ceiling: f32) -> (MockPwm, PwmChannel) {
        let mut pwm = MockPwm::new();
        let ch = PwmChannel::init(&mut pwm, MotorChannel::Left, &PwmTiming::default(), ceiling)
            .unwrap();
        (pwm, ch)
    }

    // =========================================================================
    // PwmTiming Tests
    // =========================================================================

    #[test]
    fn default_timing_wrap() {
        assert_eq!(PwmTiming::default().wrap(), 12_499);
    }

    #[test]
    fn divider_scales_wrap() {
        let timing = PwmTiming::default().with_clock_divider(2.0);
        assert_eq!(timing.wrap(), 6_249);
    }

    #[test]
    fn wrap_saturates_to_16_bits() {
        let timing = PwmTiming::default().with_frequency_hz(100);
        assert_eq!(timing.wrap(), u16::MAX as u32);
    }

    #[test]
    fn wrap_never_zero() {
        let timing = PwmTiming::default()
            .with_source_clock_hz(1_000)
            .with_frequency_hz(10_000);
        assert_eq!(timing.wrap(), 1);
    }

    #[test]
    fn divider_below_one_is_raised() {
        let timing = PwmTiming::default().with_clock_divider(0.25);
        assert_eq!(timing.clock_divider, 1.0);
    }

    // =========================================================================
    // PwmChannel Tests
    // =========================================================================

    #[test]
    fn init_configures_hardware_once() {
        let (pwm, ch) = channel(1.0);
        assert_eq!(pwm.configure_count(MotorChannel::Left), 1);
        assert_eq!(pwm.configure_count(MotorChannel::Right), 0);
        assert_eq!(ch.wrap(), 12_499);
        assert_eq!(ch.id(), MotorChannel::Left);
    }

    #[test]
    fn init_is_idempotent() {
        let mut pwm = MockPwm::new();
        let timing = PwmTiming::default();
        let a = PwmChannel::init(&mut pwm, MotorChannel::Right, &timing, 0.75).unwrap();
        let b = PwmChannel::init(&mut pwm, MotorChannel::Right, &timing, 0.75).unwrap();
        assert_eq!(a, b);
        assert_eq!(pwm.timing(MotorChannel::Right), Some(timing));
    }

    #[test]
    fn set_duty_scales_by_wrap() {
        let (mut pwm, mut ch) = channel(1.0);
        assert_eq!(ch.set_duty(&mut pwm, 0.5).unwrap(), 6_250);
        assert_eq!(pwm.level(MotorChannel::Left), 6_250);
        assert_eq!(ch.duty(), 0.5);
        assert_eq!(ch.level(), 6_250);
    }

    #[test]
    fn set_duty_negative_matches_zero() {
        let (mut pwm, mut ch) = channel(0.75);
        let negative = ch.set_duty(&mut pwm, -0.5).unwrap();
        let zero = ch.set_duty(&mut pwm, 0.0).unwrap();
        assert_eq!(negative, zero);
        assert_eq!(negative, 0);
    }

    #[test]
    fn set_duty_above_ceiling_matches_ceiling() {
        let (mut pwm, mut ch) = channel(0.75);
        let high = ch.set_duty(&mut pwm, 2.0).unwrap();
        let ceiling = ch.set_duty(&mut pwm, 0.75).unwrap();
        assert_eq!(high, ceiling);
        assert_eq!(ch.duty(), 0.75);
    }

    #[test]
    fn set_duty_nan_is_zero() {
        let (mut pwm, mut ch) = channel(1.0);
        assert_eq!(ch.set_duty(&mut pwm, f32::NAN).unwrap(), 0);
    }

    #[test]
    fn set_duty_is_single_write() {
        let (mut pwm, mut ch) = channel(1.0);
        ch.set_duty(&mut pwm, 0.3).unwrap();
        assert_eq!(pwm.writes.len(), 1);
    }

    #[test]
    fn ceiling_is_clamped_to_unit() {
        let (_, ch) = channel(4.0);
        assert_eq!(ch.ceiling(), 1.0);
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let (mut pwm, mut ch) = channel(1.0);
        ch.set_duty(&mut pwm, 0.2).unwrap();
        pwm.fail_writes = true;
        assert!(ch.set_duty(&mut pwm, 0.9).is_err());
        assert_eq!(ch.duty(), 0.2);
    }

    // =========================================================================
    // DriveTrain Tests
    // =========================================================================

    #[test]
    fn drive_train_starts_stopped() {
        let drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 0.75).unwrap();
        assert_eq!(drive.levels(), (0, 0));
        assert_eq!(drive.output().level(MotorChannel::Left), 0);
        assert_eq!(drive.output().level(MotorChannel::Right), 0);
    }

    #[test]
    fn drive_train_updates_left_then_right() {
        let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 1.0).unwrap();
        let before = drive.output().writes.len();
        drive.set_duties(DutyPair::new(0.65, 0.55)).unwrap();

        let writes = &drive.output().writes[before..];
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].0, MotorChannel::Left);
        assert_eq!(writes[1].0, MotorChannel::Right);
    }

    #[test]
    fn drive_train_hold_rewrites_last() {
        let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 1.0).unwrap();
        drive.set_duties(DutyPair::new(0.4, 0.6)).unwrap();
        let levels = drive.levels();
        assert_eq!(drive.hold().unwrap(), levels);
        assert_eq!(drive.duties(), DutyPair::new(0.4, 0.6));
    }

    #[test]
    fn drive_train_stop() {
        let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 1.0).unwrap();
        drive.set_duties(DutyPair::new(0.4, 0.6)).unwrap();
        drive.stop().unwrap();
        assert_eq!(drive.levels(), (0, 0));
    }

    #[test]
    fn drive_train_stop_reaches_right_when_left_fails() {
        let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 1.0).unwrap();
        drive.set_duties(DutyPair::new(0.5, 0.5)).unwrap();
        drive.output_mut().fail_channel = Some(MotorChannel::Left);

        assert!(drive.stop().is_err());
        assert_eq!(drive.output().level(MotorChannel::Left), 6_250);
        assert_eq!(drive.output().level(MotorChannel::Right), 0);
        assert_eq!(drive.levels(), (6_250, 0));
    }

    #[test]
    fn drive_train_set_duties_writes_both_on_left_failure() {
        let mut drive = DriveTrain::new(MockPwm::new(), PwmTiming::default(), 1.0).unwrap();
        drive.output_mut().fail_channel = Some(MotorChannel::Left);
        let before = drive.output().writes.len();

        assert!(drive.set_duties(DutyPair::new(0.4, 0.6)).is_err());
        assert_eq!(&drive.output().writes[before..], &[(MotorChannel::Right, 7_500)]);
        assert_eq!(drive.duties(), DutyPair::new(0.0, 0.6));
    }
}
