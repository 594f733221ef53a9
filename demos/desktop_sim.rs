//! Desktop simulation of the line follower.
//!
//! A toy kinematic model stands in for the robot: the line drifts across the
//! camera frame like a gentle curve, and the difference between the two motor
//! duties steers it back toward the frame center. Telemetry is rendered to
//! the terminal on a detached renderer thread, and a scripted button press
//! rotates the page every couple of seconds.
//!
//! ```bash
//! cargo run --example desktop_sim
//! RUST_LOG=debug cargo run --example desktop_sim
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::{LevelFilter, Metadata, Record};
use rs_linefollow::telemetry::spawn_renderer;
use rs_linefollow::traits::{
    AnalogInput, ButtonInput, FrameGrabber, MotorChannel, PwmOutput, TelemetrySink,
};
use rs_linefollow::{Config, ControlLoop, LoopConfig, PwmTiming};

/// Iterations to simulate.
const ITERATIONS: u64 = 120;

/// Pixels per loop period the line moves per unit of duty difference.
const TURN_RATE_PX: f32 = 40.0;

// ============================================================================
// Logging
// ============================================================================

struct StdoutLogger {
    start: Instant,
}

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{:>5} [{:>6} ms] {} - {}",
                record.level(),
                self.start.elapsed().as_millis(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StdoutLogger> = OnceLock::new();

fn init_logging() {
    let level = match std::env::var("RUST_LOG").as_deref() {
        Ok("trace") => LevelFilter::Trace,
        Ok("debug") => LevelFilter::Debug,
        Ok("warn") => LevelFilter::Warn,
        _ => LevelFilter::Info,
    };
    let logger = LOGGER.get_or_init(|| StdoutLogger {
        start: Instant::now(),
    });
    let _ = log::set_logger(logger).map(|()| log::set_max_level(level));
}

// ============================================================================
// Simulated World
// ============================================================================

#[derive(Debug)]
struct World {
    /// Line centroid on the scan row, in pixels.
    line_px: f32,
    /// Frame width in pixels.
    width: f32,
    /// Duties currently applied, left then right.
    duties: [f32; 2],
    wraps: [u32; 2],
    tick: u64,
}

impl World {
    fn new(width: u16) -> Self {
        Self {
            line_px: width as f32 * 0.2,
            width: width as f32,
            duties: [0.0; 2],
            wraps: [1; 2],
            tick: 0,
        }
    }

    /// Advance one loop period and return the new centroid.
    fn step(&mut self) -> i32 {
        self.tick += 1;
        let curve = 1.5 * ((self.tick as f32) / 25.0).sin();
        let turn = (self.duties[0] - self.duties[1]) * TURN_RATE_PX;
        self.line_px = (self.line_px + turn + curve).clamp(0.0, self.width - 1.0);
        self.line_px.round() as i32
    }
}

type Shared = Rc<RefCell<World>>;

struct SimCamera {
    world: Shared,
    pending: u8,
    centroid: i32,
}

impl FrameGrabber for SimCamera {
    fn request_capture(&mut self) {
        self.pending = 2;
    }

    fn is_capture_pending(&mut self) -> bool {
        if self.pending > 0 {
            self.pending -= 1;
            return true;
        }
        false
    }

    fn decode_frame(&mut self) {
        self.centroid = self.world.borrow_mut().step();
    }

    fn line_centroid(&mut self, _row: u16) -> i32 {
        self.centroid
    }
}

struct SimPwm {
    world: Shared,
}

impl PwmOutput for SimPwm {
    type Error = core::convert::Infallible;

    fn configure(&mut self, channel: MotorChannel, timing: &PwmTiming) -> Result<(), Self::Error> {
        self.world.borrow_mut().wraps[channel.index()] = timing.wrap();
        Ok(())
    }

    fn write_level(&mut self, channel: MotorChannel, level: u32) -> Result<(), Self::Error> {
        let mut world = self.world.borrow_mut();
        let full = world.wraps[channel.index()] + 1;
        world.duties[channel.index()] = level as f32 / full as f32;
        Ok(())
    }
}

/// Knob fixed at a gentle gain.
struct FixedKnob(f32);

impl AnalogInput for FixedKnob {
    fn read_normalized(&mut self) -> f32 {
        self.0
    }
}

/// Button held for a few iterations out of every forty.
struct ScriptedButton {
    world: Shared,
}

impl ButtonInput for ScriptedButton {
    fn is_pressed(&mut self) -> bool {
        self.world.borrow().tick % 40 >= 36
    }
}

struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Prints each frame on one terminal line.
#[derive(Default)]
struct ConsoleSink {
    rows: Vec<String>,
}

impl TelemetrySink for ConsoleSink {
    type Error = core::convert::Infallible;

    fn write_row(&mut self, _row: usize, text: &str) -> Result<(), Self::Error> {
        self.rows.push(text.to_owned());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        println!("  | {}", self.rows.join(" | "));
        self.rows.clear();
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::default().with_loop(LoopConfig::default().with_period_ms(20));
    let world: Shared = Rc::new(RefCell::new(World::new(config.steering.frame_width)));

    let camera = SimCamera {
        world: world.clone(),
        pending: 0,
        centroid: 0,
    };
    let pwm = SimPwm {
        world: world.clone(),
    };
    let (sink, renderer) = spawn_renderer(ConsoleSink::default())?;

    let mut control = ControlLoop::new(
        config,
        camera,
        FixedKnob(0.02),
        pwm,
        Instant::now(),
        ThreadDelay,
    )?
    .with_telemetry(sink)
    .with_mode_button(ScriptedButton {
        world: world.clone(),
    });

    control.splash();
    let mut worst = 0;
    for _ in 0..ITERATIONS {
        let report = control.iterate()?;
        if let Some(p) = report.position {
            let error = control.steering().error(p).abs();
            worst = worst.max(error);
        }
    }

    let final_px = world.borrow().line_px;
    drop(control);
    let _ = renderer.join();

    log::info!(
        "simulated {} iterations: line ended at {:.1} px, worst error {} px",
        ITERATIONS,
        final_px,
        worst
    );
    Ok(())
}
