//! The closed control loop: sense, compute, actuate, repeat.
//!
//! [`ControlLoop`] owns every collaborator and runs one fixed sequence per
//! iteration:
//!
//! 1. read the line position from the camera (optionally bounded by a timeout)
//! 2. read the gain knob
//! 3. compute both duties with the proportional law
//! 4. write both PWM channels, or apply the [`StallPolicy`] on a timeout
//! 5. poll the mode button and rotate the telemetry page on a press
//! 6. publish telemetry (best effort)
//! 7. wait one loop period
//!
//! Actuation always completes before the mode poll or telemetry run, so
//! neither can delay a motor update.
//!
//! # Example
//!
//! ```rust
//! use rs_linefollow::{Config, ControlLoop, LoopState};
//! use rs_linefollow::hal::{MockAnalog, MockCamera, MockClock, MockDelay, MockDisplay, MockPwm};
//!
//! let mut camera = MockCamera::new();
//! camera.queue_centroid(30); // line 10 px left of center
//!
//! let mut control = ControlLoop::new(
//!     Config::default(),
//!     camera,
//!     MockAnalog::new(0.02), // gain 0.01
//!     MockPwm::new(),
//!     MockClock::new(),
//!     MockDelay::new(),
//! )
//! .unwrap()
//! .with_telemetry(MockDisplay::new());
//!
//! let report = control.iterate().unwrap();
//! assert!((report.duties.left - 0.7).abs() < 1e-5);
//! assert!((report.duties.right - 0.5).abs() < 1e-5);
//! assert_eq!(control.state(), LoopState::Running);
//! assert_eq!(control.delay().delays_ms, vec![100]);
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::actuation::DriveTrain;
use crate::config::{Config, ConfigError, ShortString, StallPolicy};
use crate::mode::{ModeSwitch, TelemetryPage};
use crate::sensor::{CaptureTimeout, GainKnob, GainReading, LineSensor};
use crate::steering::{DutyPair, LinePosition, SteeringController};
use crate::telemetry::{Telemetry, TelemetrySnapshot};
use crate::traits::{
    AnalogInput, ButtonInput, Clock, FrameGrabber, NoButton, NullSink, PwmOutput, TelemetrySink,
};

/// Loop state as seen from outside.
///
/// The pause lasts only for the mode-poll step of one iteration, so
/// [`ControlLoop::state`] reads `Running` between iterations. The
/// [`IterationReport::state`] of the iteration that rotated the page carries
/// `PausedForModeSwitch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Normal sense/compute/actuate cycling.
    #[default]
    Running,
    /// A debounced button press is rotating the telemetry page.
    PausedForModeSwitch,
}

/// How the line position of an iteration was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorOutcome {
    /// A frame completed and was decoded.
    Fresh,
    /// The bounded capture wait expired; the stall policy was applied.
    TimedOut(CaptureTimeout),
}

/// Everything that happened in one iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationReport {
    /// Zero-based iteration counter.
    pub index: u64,
    /// Line centroid, `None` on a capture timeout.
    pub position: Option<LinePosition>,
    /// Gain knob sample.
    pub gain: GainReading,
    /// Duties written to the motors.
    pub duties: DutyPair,
    /// Levels written to the motors, `(left, right)`.
    pub levels: (u32, u32),
    /// Fresh frame or timeout.
    pub outcome: SensorOutcome,
    /// `PausedForModeSwitch` if this iteration rotated the telemetry page.
    pub state: LoopState,
}

impl IterationReport {
    /// The subset the telemetry display renders.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            gain: self.gain,
            duties: self.duties,
            position: self.position,
        }
    }
}

/// Errors raised while building a [`ControlLoop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopError<E> {
    /// The configuration failed validation.
    Config(ConfigError),
    /// Initializing the PWM channels failed.
    Actuation(E),
}

impl<E: fmt::Debug> fmt::Display for LoopError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::Config(e) => write!(f, "invalid configuration: {}", e),
            LoopError::Actuation(e) => write!(f, "PWM initialization failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for LoopError<E> {}

impl<E> From<ConfigError> for LoopError<E> {
    fn from(e: ConfigError) -> Self {
        LoopError::Config(e)
    }
}

/// Line-following control loop.
///
/// # Type Parameters
///
/// - `F`: camera ([`FrameGrabber`])
/// - `A`: gain potentiometer ([`AnalogInput`])
/// - `P`: motor PWM ([`PwmOutput`])
/// - `K`: time source ([`Clock`])
/// - `D`: end-of-iteration delay ([`DelayNs`])
/// - `S`: telemetry display ([`TelemetrySink`]), [`NullSink`] by default
/// - `B`: mode button ([`ButtonInput`]), [`NoButton`] by default
pub struct ControlLoop<F, A, P, K, D, S = NullSink, B = NoButton>
where
    F: FrameGrabber,
    A: AnalogInput,
    P: PwmOutput,
    K: Clock,
    D: DelayNs,
    S: TelemetrySink,
    B: ButtonInput,
{
    sensor: LineSensor<F>,
    knob: GainKnob<A>,
    steering: SteeringController,
    drive: DriveTrain<P>,
    clock: K,
    delay: D,
    telemetry: Telemetry<S>,
    mode: ModeSwitch<B>,
    state: LoopState,
    capture_timeout_ms: Option<u32>,
    stall_policy: StallPolicy,
    period_ms: u32,
    debounce_ms: u32,
    name: ShortString,
    iterations: u64,
    stalls: u64,
}

impl<F, A, P, K, D> ControlLoop<F, A, P, K, D>
where
    F: FrameGrabber,
    A: AnalogInput,
    P: PwmOutput,
    K: Clock,
    D: DelayNs,
{
    /// Validate `config`, initialize both PWM channels and stop the motors.
    ///
    /// Telemetry goes nowhere and there is no mode button until
    /// [`with_telemetry`](Self::with_telemetry) and
    /// [`with_mode_button`](Self::with_mode_button) are called.
    pub fn new(
        config: Config,
        camera: F,
        knob: A,
        pwm: P,
        clock: K,
        delay: D,
    ) -> Result<Self, LoopError<P::Error>> {
        config.validate()?;
        let drive = DriveTrain::new(pwm, config.pwm.timing, config.duty_ceiling())
            .map_err(LoopError::Actuation)?;

        log::info!(
            "{}: frame {}x{}, scan row {}, wrap {}, period {} ms",
            config.device.name,
            config.steering.frame_width,
            config.sensor.frame_height,
            config.sensor.scan_row,
            config.pwm.timing.wrap(),
            config.control_loop.period_ms
        );

        Ok(Self {
            sensor: LineSensor::new(camera, config.sensor.scan_row),
            knob: GainKnob::new(knob, config.gain.clone()),
            steering: SteeringController::new(config.steering.clone()),
            drive,
            clock,
            delay,
            telemetry: Telemetry::new(NullSink, config.telemetry.initial_page)
                .with_enabled(config.telemetry.enabled),
            mode: ModeSwitch::new(NoButton, config.telemetry.debounce_ms),
            state: LoopState::Running,
            capture_timeout_ms: config.sensor.capture_timeout_ms,
            stall_policy: config.sensor.stall_policy,
            period_ms: config.control_loop.period_ms,
            debounce_ms: config.telemetry.debounce_ms,
            name: config.device.name,
            iterations: 0,
            stalls: 0,
        })
    }
}

impl<F, A, P, K, D, S, B> ControlLoop<F, A, P, K, D, S, B>
where
    F: FrameGrabber,
    A: AnalogInput,
    P: PwmOutput,
    K: Clock,
    D: DelayNs,
    S: TelemetrySink,
    B: ButtonInput,
{
    /// Send telemetry to `sink`, keeping the current page.
    pub fn with_telemetry<S2: TelemetrySink>(self, sink: S2) -> ControlLoop<F, A, P, K, D, S2, B> {
        let page = self.telemetry.page();
        ControlLoop {
            telemetry: Telemetry::new(sink, page).with_enabled(self.telemetry.is_enabled()),
            sensor: self.sensor,
            knob: self.knob,
            steering: self.steering,
            drive: self.drive,
            clock: self.clock,
            delay: self.delay,
            mode: self.mode,
            state: self.state,
            capture_timeout_ms: self.capture_timeout_ms,
            stall_policy: self.stall_policy,
            period_ms: self.period_ms,
            debounce_ms: self.debounce_ms,
            name: self.name,
            iterations: self.iterations,
            stalls: self.stalls,
        }
    }

    /// Rotate telemetry pages on presses of `button`.
    pub fn with_mode_button<B2: ButtonInput>(
        self,
        button: B2,
    ) -> ControlLoop<F, A, P, K, D, S, B2> {
        ControlLoop {
            mode: ModeSwitch::new(button, self.debounce_ms),
            sensor: self.sensor,
            knob: self.knob,
            steering: self.steering,
            drive: self.drive,
            clock: self.clock,
            delay: self.delay,
            telemetry: self.telemetry,
            state: self.state,
            capture_timeout_ms: self.capture_timeout_ms,
            stall_policy: self.stall_policy,
            period_ms: self.period_ms,
            debounce_ms: self.debounce_ms,
            name: self.name,
            iterations: self.iterations,
            stalls: self.stalls,
        }
    }

    /// Show the device name on the display before the first iteration.
    pub fn splash(&mut self) {
        let name = self.name.clone();
        self.telemetry.show_message(name.as_str(), Some("Starting..."));
    }

    /// Run one iteration. See the module docs for the sequence.
    ///
    /// Only PWM write errors are returned; telemetry errors are ignored. On
    /// error the period delay is skipped.
    pub fn iterate(&mut self) -> Result<IterationReport, P::Error> {
        let index = self.iterations;
        self.iterations = self.iterations.wrapping_add(1);

        let sensed = match self.capture_timeout_ms {
            Some(timeout_ms) => self.sensor.read_line_position_within(timeout_ms, &self.clock),
            None => Ok(self.sensor.read_line_position()),
        };
        let gain = self.knob.read();

        let (position, outcome) = match sensed {
            Ok(position) => {
                let duties = self.steering.compute(position, gain.gain);
                self.drive.set_duties(duties)?;
                (Some(position), SensorOutcome::Fresh)
            }
            Err(timeout) => {
                self.stalls = self.stalls.wrapping_add(1);
                log::warn!("{}, applying {:?}", timeout, self.stall_policy);
                match self.stall_policy {
                    StallPolicy::StopMotors => self.drive.stop()?,
                    StallPolicy::HoldLast => self.drive.hold()?,
                };
                (None, SensorOutcome::TimedOut(timeout))
            }
        };

        let mut report = IterationReport {
            index,
            position,
            gain,
            duties: self.drive.duties(),
            levels: self.drive.levels(),
            outcome,
            state: LoopState::Running,
        };

        if self.mode.poll(self.clock.now_ms()) {
            self.state = LoopState::PausedForModeSwitch;
            report.state = self.state;
            let page = self.telemetry.rotate();
            log::info!("{:?}: telemetry page {:?}", self.state, page);
            self.state = LoopState::Running;
        }

        self.telemetry.publish(&report.snapshot());

        match report.position {
            Some(p) => log::debug!(
                "#{} COM: {} gain: {:.3} L: {:.2} R: {:.2}",
                index,
                p.px(),
                gain.gain,
                report.duties.left,
                report.duties.right
            ),
            None => log::debug!(
                "#{} COM: -- L: {:.2} R: {:.2}",
                index,
                report.duties.left,
                report.duties.right
            ),
        }

        self.delay.delay_ms(self.period_ms);
        Ok(report)
    }

    /// Iterate forever.
    ///
    /// PWM errors are logged and the loop carries on after one period.
    pub fn run(&mut self) -> !
    where
        P::Error: fmt::Debug,
    {
        log::info!("{}: control loop running", self.name);
        loop {
            if let Err(e) = self.iterate() {
                log::warn!("motor update failed: {:?}", e);
                self.delay.delay_ms(self.period_ms);
            }
        }
    }

    /// Stop both motors and give back the PWM peripheral.
    pub fn shutdown(mut self) -> Result<P, P::Error> {
        self.drive.stop()?;
        log::info!("{}: motors stopped after {} iterations", self.name, self.iterations);
        Ok(self.drive.into_output())
    }

    /// Current loop state.
    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Page the display is showing.
    #[inline]
    pub fn page(&self) -> TelemetryPage {
        self.telemetry.page()
    }

    /// Iterations started so far.
    #[inline]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Capture timeouts so far.
    #[inline]
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    /// The steering law in use.
    pub fn steering(&self) -> &SteeringController {
        &self.steering
    }

    /// Both motor channels.
    pub fn drive(&self) -> &DriveTrain<P> {
        &self.drive
    }

    /// Mutably borrow the PWM peripheral.
    pub fn pwm_mut(&mut self) -> &mut P {
        self.drive.output_mut()
    }

    /// Borrow the camera.
    pub fn camera(&self) -> &F {
        self.sensor.camera()
    }

    /// Mutably borrow the camera.
    pub fn camera_mut(&mut self) -> &mut F {
        self.sensor.camera_mut()
    }

    /// Mutably borrow the gain knob input.
    pub fn knob_mut(&mut self) -> &mut A {
        self.knob.input_mut()
    }

    /// Mutably borrow the mode button.
    pub fn button_mut(&mut self) -> &mut B {
        self.mode.button_mut()
    }

    /// Borrow the telemetry sink.
    pub fn sink(&self) -> &S {
        self.telemetry.sink()
    }

    /// Mutably borrow the clock.
    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }

    /// Borrow the delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }
}
