//! Loop time base from the ESP-IDF high-resolution timer.
//!
//! The control loop reads it on every poll of a bounded camera capture (only
//! when `capture_timeout_ms` is set) and once per iteration when the mode
//! button is sampled for debouncing. Millisecond resolution is enough for
//! the 50 ms debounce window and for capture timeouts.

use crate::traits::Clock;

/// Milliseconds since boot, read from `esp_timer`.
///
/// Zero-sized; the bin hands one to `ControlLoop::new`.
///
/// ```ignore
/// use rs_linefollow::hal::esp32::Esp32Clock;
/// use rs_linefollow::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let pressed_at = clock.now_ms();
/// let settled = clock.now_ms() - pressed_at >= 50;
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Time base for the control loop.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // SAFETY: reads the free-running timer, callable from any task
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        micros.max(0) as u64 / 1000
    }
}
