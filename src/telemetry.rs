//! Telemetry rows for the status display.
//!
//! Telemetry is a side branch of the control loop: it reads a snapshot of the
//! iteration that just ran and never feeds anything back. Every sink error is
//! swallowed here so a slow or broken display cannot abort actuation.
//!
//! # Pages
//!
//! | Page | Rows |
//! |------|------|
//! | Overview | `Gain: 0.25`, `PWM L:65% PWM R:55%`, `COM: 54` |
//! | Gain | `ADC Versus Gain`, `V: 1.65V`, `Gain: 0.25` |
//! | Pwm | `PWM Values`, `Left PWM: 65%`, `Right PWM: 55%` |
//! | Centroid | `Line COM`, `COM: 54` |
//!
//! A stalled capture renders the centroid as `COM: --`.
//!
//! # Detached Rendering (`std`)
//!
//! [`spawn_renderer`] moves a sink onto its own thread. The loop keeps a
//! [`DetachedSink`] whose `flush` hands the frame over a one-slot channel
//! with `try_send`: if the renderer is still busy the frame is dropped, never
//! waited on. The renderer thread owns nothing but the sink.

use core::fmt::Write;

use heapless::{String as HString, Vec as HVec};

use crate::mode::TelemetryPage;
use crate::sensor::GainReading;
use crate::steering::{DutyPair, LinePosition};
use crate::traits::TelemetrySink;

/// Longest row, in bytes.
pub const ROW_CAPACITY: usize = 32;

/// Most rows on any page.
pub const MAX_ROWS: usize = 4;

/// One display row.
pub type Row = HString<ROW_CAPACITY>;

/// All rows of one page.
pub type Rows = HVec<Row, MAX_ROWS>;

/// What the display needs to know about one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySnapshot {
    /// Gain knob sample.
    pub gain: GainReading,
    /// Duties written to the motors.
    pub duties: DutyPair,
    /// Line centroid, `None` if the capture stalled.
    pub position: Option<LinePosition>,
}

fn row(args: core::fmt::Arguments<'_>) -> Row {
    let mut r = Row::new();
    // Overlong rows are cut off by the fixed capacity
    let _ = r.write_fmt(args);
    r
}

fn centroid_row(position: Option<LinePosition>) -> Row {
    match position {
        Some(p) => row(format_args!("COM: {}", p.px())),
        None => row(format_args!("COM: --")),
    }
}

/// Format the rows of one page.
///
/// ```
/// use rs_linefollow::telemetry::{format_page, TelemetrySnapshot};
/// use rs_linefollow::{DutyPair, LinePosition, TelemetryPage};
///
/// let snapshot = TelemetrySnapshot {
///     duties: DutyPair::new(0.65, 0.55),
///     position: Some(LinePosition::new(54)),
///     ..Default::default()
/// };
/// let rows = format_page(TelemetryPage::Overview, &snapshot);
/// assert_eq!(rows[1].as_str(), "PWM L:65% PWM R:55%");
/// assert_eq!(rows[2].as_str(), "COM: 54");
/// ```
pub fn format_page(page: TelemetryPage, snapshot: &TelemetrySnapshot) -> Rows {
    let left_pct = snapshot.duties.left * 100.0;
    let right_pct = snapshot.duties.right * 100.0;
    let gain = snapshot.gain.gain;

    let rows: [Option<Row>; MAX_ROWS] = match page {
        TelemetryPage::Overview => [
            Some(row(format_args!("Gain: {:.2}", gain))),
            Some(row(format_args!("PWM L:{:.0}% PWM R:{:.0}%", left_pct, right_pct))),
            Some(centroid_row(snapshot.position)),
            None,
        ],
        TelemetryPage::Gain => [
            Some(row(format_args!("ADC Versus Gain"))),
            Some(row(format_args!("V: {:.2}V", snapshot.gain.volts))),
            Some(row(format_args!("Gain: {:.2}", gain))),
            None,
        ],
        TelemetryPage::Pwm => [
            Some(row(format_args!("PWM Values"))),
            Some(row(format_args!("Left PWM: {:.0}%", left_pct))),
            Some(row(format_args!("Right PWM: {:.0}%", right_pct))),
            None,
        ],
        TelemetryPage::Centroid => [
            Some(row(format_args!("Line COM"))),
            Some(centroid_row(snapshot.position)),
            None,
            None,
        ],
    };

    rows.into_iter().flatten().collect()
}

/// Page state plus the sink rows are written to.
pub struct Telemetry<S: TelemetrySink> {
    sink: S,
    page: TelemetryPage,
    enabled: bool,
    dropped: u32,
}

impl<S: TelemetrySink> Telemetry<S> {
    /// Start on `page`, writing to `sink`.
    pub fn new(sink: S, page: TelemetryPage) -> Self {
        Self {
            sink,
            page,
            enabled: true,
            dropped: 0,
        }
    }

    /// Turn rendering on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether `publish` renders anything.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current page.
    #[inline]
    pub fn page(&self) -> TelemetryPage {
        self.page
    }

    /// Advance to the next page.
    pub fn rotate(&mut self) -> TelemetryPage {
        self.page = self.page.next();
        self.page
    }

    /// Frames lost to sink errors so far.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Render the current page. Best effort: sink errors are counted and
    /// logged at trace level, never returned.
    pub fn publish(&mut self, snapshot: &TelemetrySnapshot) {
        if !self.enabled {
            return;
        }
        let rows = format_page(self.page, snapshot);
        let mut ok = true;
        for (i, text) in rows.iter().enumerate() {
            ok &= self.sink.write_row(i, text.as_str()).is_ok();
        }
        ok &= self.sink.flush().is_ok();
        if !ok {
            self.dropped = self.dropped.wrapping_add(1);
            log::trace!("telemetry frame dropped ({} total)", self.dropped);
        }
    }

    /// Show a short message (splash, errors) outside the page cycle.
    pub fn show_message(&mut self, line1: &str, line2: Option<&str>) {
        let _ = self.sink.write_row(0, line1);
        if let Some(l2) = line2 {
            let _ = self.sink.write_row(1, l2);
        }
        let _ = self.sink.flush();
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(feature = "std")]
pub use detached::{spawn_renderer, DetachedError, DetachedSink};

#[cfg(feature = "std")]
mod detached {
    use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
    use std::thread::{self, JoinHandle};

    use super::{Row, Rows, MAX_ROWS};
    use crate::traits::TelemetrySink;

    /// Why a detached frame did not reach the renderer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum DetachedError {
        /// The renderer is still drawing the previous frame.
        Busy,
        /// The renderer thread has exited.
        Disconnected,
        /// Row index beyond the page size.
        RowOutOfRange,
    }

    type Frame = [Option<Row>; MAX_ROWS];

    /// Loop-side half of a detached renderer.
    ///
    /// Collects rows locally; `flush` offers the frame to the renderer
    /// thread without ever blocking.
    pub struct DetachedSink {
        pending: Frame,
        tx: SyncSender<Frame>,
    }

    impl TelemetrySink for DetachedSink {
        type Error = DetachedError;

        fn write_row(&mut self, row: usize, text: &str) -> Result<(), DetachedError> {
            let slot = self.pending.get_mut(row).ok_or(DetachedError::RowOutOfRange)?;
            let mut r = Row::new();
            for c in text.chars() {
                if r.push(c).is_err() {
                    break;
                }
            }
            *slot = Some(r);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DetachedError> {
            let frame = core::mem::take(&mut self.pending);
            match self.tx.try_send(frame) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(DetachedError::Busy),
                Err(TrySendError::Disconnected(_)) => Err(DetachedError::Disconnected),
            }
        }
    }

    fn render<S: TelemetrySink>(mut sink: S, rx: Receiver<Frame>) -> S {
        for frame in rx {
            let rows: Rows = frame.into_iter().flatten().collect();
            for (i, text) in rows.iter().enumerate() {
                let _ = sink.write_row(i, text.as_str());
            }
            let _ = sink.flush();
        }
        sink
    }

    /// Move `sink` onto a renderer thread.
    ///
    /// The thread exits and hands the sink back through the join handle once
    /// the returned [`DetachedSink`] is dropped.
    pub fn spawn_renderer<S>(sink: S) -> std::io::Result<(DetachedSink, JoinHandle<S>)>
    where
        S: TelemetrySink + Send + 'static,
    {
        let (tx, rx) = sync_channel::<Frame>(1);
        let handle = thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || render(sink, rx))?;
        Ok((
            DetachedSink {
                pending: Frame::default(),
                tx,
            },
            handle,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockDisplay;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            gain: GainReading {
                normalized: 0.5,
                volts: 1.65,
                gain: 0.25,
            },
            duties: DutyPair::new(0.65, 0.55),
            position: Some(LinePosition::new(54)),
        }
    }

    fn texts(rows: &Rows) -> Vec<&str> {
        rows.iter().map(|r| r.as_str()).collect()
    }

    #[test]
    fn overview_page() {
        let rows = format_page(TelemetryPage::Overview, &snapshot());
        assert_eq!(
            texts(&rows),
            vec!["Gain: 0.25", "PWM L:65% PWM R:55%", "COM: 54"]
        );
    }

    #[test]
    fn gain_page() {
        let rows = format_page(TelemetryPage::Gain, &snapshot());
        assert_eq!(texts(&rows), vec!["ADC Versus Gain", "V: 1.65V", "Gain: 0.25"]);
    }

    #[test]
    fn pwm_page() {
        let rows = format_page(TelemetryPage::Pwm, &snapshot());
        assert_eq!(
            texts(&rows),
            vec!["PWM Values", "Left PWM: 65%", "Right PWM: 55%"]
        );
    }

    #[test]
    fn centroid_page() {
        let rows = format_page(TelemetryPage::Centroid, &snapshot());
        assert_eq!(texts(&rows), vec!["Line COM", "COM: 54"]);
    }

    #[test]
    fn stalled_capture_shows_dashes() {
        let mut s = snapshot();
        s.position = None;
        let rows = format_page(TelemetryPage::Centroid, &s);
        assert_eq!(rows[1].as_str(), "COM: --");
    }

    #[test]
    fn publish_writes_rows_and_flushes() {
        let mut t = Telemetry::new(MockDisplay::new(), TelemetryPage::Pwm);
        t.publish(&snapshot());
        assert_eq!(t.sink().flush_count, 1);
        assert_eq!(t.sink().visible_rows(), vec!["PWM Values", "Left PWM: 65%", "Right PWM: 55%"]);
    }

    #[test]
    fn publish_disabled_is_silent() {
        let mut t = Telemetry::new(MockDisplay::new(), TelemetryPage::Overview).with_enabled(false);
        t.publish(&snapshot());
        assert_eq!(t.sink().flush_count, 0);
    }

    #[test]
    fn publish_swallows_sink_errors() {
        let mut t = Telemetry::new(MockDisplay::new().failing(), TelemetryPage::Overview);
        t.publish(&snapshot());
        t.publish(&snapshot());
        assert_eq!(t.dropped(), 2);
    }

    #[test]
    fn rotate_cycles_pages() {
        let mut t = Telemetry::new(MockDisplay::new(), TelemetryPage::Overview);
        assert_eq!(t.rotate(), TelemetryPage::Gain);
        assert_eq!(t.rotate(), TelemetryPage::Pwm);
        assert_eq!(t.rotate(), TelemetryPage::Centroid);
        assert_eq!(t.rotate(), TelemetryPage::Overview);
    }

    #[test]
    fn show_message_two_lines() {
        let mut t = Telemetry::new(MockDisplay::new(), TelemetryPage::Overview);
        t.show_message("rs-linefollow", Some("Starting..."));
        assert_eq!(t.sink().visible_rows(), vec!["rs-linefollow", "Starting..."]);
    }

    // =========================================================================
    // Detached Renderer Tests
    // =========================================================================

    #[test]
    fn detached_renderer_delivers_frames() {
        let (mut detached, handle) = spawn_renderer(MockDisplay::new()).unwrap();
        detached.write_row(0, "Line COM").unwrap();
        detached.write_row(1, "COM: 12").unwrap();
        detached.flush().unwrap();
        drop(detached);

        let display = handle.join().unwrap();
        assert_eq!(display.flush_count, 1);
        assert_eq!(display.visible_rows(), vec!["Line COM", "COM: 12"]);
    }

    #[test]
    fn detached_row_out_of_range() {
        let (mut detached, handle) = spawn_renderer(MockDisplay::new()).unwrap();
        assert_eq!(
            detached.write_row(MAX_ROWS, "nope"),
            Err(DetachedError::RowOutOfRange)
        );
        drop(detached);
        handle.join().unwrap();
    }

    #[test]
    fn detached_flush_never_blocks_on_slow_renderer() {
        use std::sync::mpsc::channel;

        let (release_tx, release_rx) = channel::<()>();
        let display = MockDisplay::new().blocking_flush(release_rx);
        let (mut detached, handle) = spawn_renderer(display).unwrap();

        let mut busy = 0;
        for _ in 0..4 {
            detached.write_row(0, "frame").unwrap();
            if detached.flush() == Err(DetachedError::Busy) {
                busy += 1;
            }
        }
        assert!(busy >= 2);

        drop(detached);
        // Let every delivered frame finish rendering
        for _ in 0..4 {
            let _ = release_tx.send(());
        }
        handle.join().unwrap();
    }
}
