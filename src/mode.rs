//! Debounced mode button and the telemetry pages it rotates through.
//!
//! The switch is polled once per loop iteration but keeps its own timestamp
//! state, so its cadence is independent of the control loop period and it
//! never gates the sense/compute/actuate sequence.

use crate::traits::ButtonInput;

/// Which set of rows the telemetry display shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TelemetryPage {
    /// Gain, both PWM duties and the centroid on one screen.
    #[default]
    Overview,
    /// Knob voltage and derived gain.
    Gain,
    /// Left and right PWM duties.
    Pwm,
    /// Line centroid.
    Centroid,
}

impl TelemetryPage {
    /// The page after this one, wrapping around.
    ///
    /// ```
    /// use rs_linefollow::TelemetryPage;
    ///
    /// assert_eq!(TelemetryPage::Overview.next(), TelemetryPage::Gain);
    /// assert_eq!(TelemetryPage::Centroid.next(), TelemetryPage::Overview);
    /// ```
    pub const fn next(self) -> Self {
        match self {
            TelemetryPage::Overview => TelemetryPage::Gain,
            TelemetryPage::Gain => TelemetryPage::Pwm,
            TelemetryPage::Pwm => TelemetryPage::Centroid,
            TelemetryPage::Centroid => TelemetryPage::Overview,
        }
    }
}

/// Debounced rising-edge detector over a raw button.
///
/// A change of the raw level restarts the debounce timer. Once the raw level
/// has held for `debounce_ms`, it becomes the stable level; a stable
/// released-to-pressed transition is reported as one press.
///
/// # Example
///
/// ```rust
/// use rs_linefollow::mode::ModeSwitch;
/// use rs_linefollow::hal::MockButton;
///
/// let mut switch = ModeSwitch::new(MockButton::new(), 50);
/// switch.button_mut().set(true);
///
/// assert!(!switch.poll(0));  // bouncing
/// assert!(!switch.poll(30)); // still inside the window
/// assert!(switch.poll(60));  // held for 50 ms: one press
/// assert!(!switch.poll(90)); // no repeat while held
/// ```
#[derive(Debug)]
pub struct ModeSwitch<B: ButtonInput> {
    button: B,
    debounce_ms: u64,
    raw: bool,
    stable: bool,
    last_change_ms: u64,
}

impl<B: ButtonInput> ModeSwitch<B> {
    /// Wrap a raw button with the given debounce interval.
    pub fn new(button: B, debounce_ms: u32) -> Self {
        Self {
            button,
            debounce_ms: debounce_ms as u64,
            raw: false,
            stable: false,
            last_change_ms: 0,
        }
    }

    /// Sample the button; returns true exactly once per debounced press.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let raw = self.button.is_pressed();
        if raw != self.raw {
            self.raw = raw;
            self.last_change_ms = now_ms;
        }

        let settled = now_ms.saturating_sub(self.last_change_ms) >= self.debounce_ms;
        if settled && self.raw != self.stable {
            self.stable = self.raw;
            return self.stable;
        }
        false
    }

    /// Debounced level.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.stable
    }

    /// Borrow the underlying button.
    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockButton;

    fn switch() -> ModeSwitch<MockButton> {
        ModeSwitch::new(MockButton::new(), 50)
    }

    #[test]
    fn page_cycle_returns_to_start() {
        let mut page = TelemetryPage::default();
        for _ in 0..4 {
            page = page.next();
        }
        assert_eq!(page, TelemetryPage::Overview);
    }

    #[test]
    fn idle_button_never_fires() {
        let mut s = switch();
        for t in (0..1000).step_by(10) {
            assert!(!s.poll(t));
        }
    }

    #[test]
    fn press_reported_after_debounce() {
        let mut s = switch();
        s.button_mut().set(true);
        assert!(!s.poll(100));
        assert!(!s.poll(149));
        assert!(s.poll(150));
        assert!(s.is_held());
    }

    #[test]
    fn bounce_restarts_timer() {
        let mut s = switch();
        s.button_mut().set(true);
        assert!(!s.poll(0));
        s.button_mut().set(false);
        assert!(!s.poll(20));
        s.button_mut().set(true);
        assert!(!s.poll(40));
        assert!(!s.poll(80)); // only 40 ms since last bounce
        assert!(s.poll(90));
    }

    #[test]
    fn release_is_not_a_press() {
        let mut s = switch();
        s.button_mut().set(true);
        s.poll(0);
        assert!(s.poll(50));

        s.button_mut().set(false);
        assert!(!s.poll(60));
        assert!(!s.poll(200));
        assert!(!s.is_held());
    }

    #[test]
    fn second_press_after_release() {
        let mut s = switch();
        s.button_mut().set(true);
        s.poll(0);
        assert!(s.poll(50));
        s.button_mut().set(false);
        s.poll(100);
        s.poll(150);
        s.button_mut().set(true);
        s.poll(200);
        assert!(s.poll(250));
    }
}
