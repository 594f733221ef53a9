//! Line camera co-processor on an ESP32 UART.
//!
//! The camera, its frame buffer and the line extraction run on a separate
//! board. This driver only speaks its three-byte request/reply protocol:
//!
//! ```text
//! request:  'C' row_lo row_hi        capture a frame, extract on `row`
//! reply:    'L' com_lo com_hi        centroid as little-endian i16
//! ```
//!
//! The reply arrives once the frame is captured and processed, so "capture
//! pending" simply means "reply not fully received yet".
//!
//! # Wiring
//!
//! - GPIO6 (TX) → camera RX
//! - GPIO7 (RX) ← camera TX
//! - Common GND

use crate::traits::FrameGrabber;
use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::uart::UartDriver;

const REQUEST: u8 = b'C';
const REPLY: u8 = b'L';
const FRAME_LEN: usize = 3;

/// UART link to the line camera board.
///
/// # Example
///
/// ```ignore
/// use rs_linefollow::hal::esp32::{pins, Esp32Camera};
/// use esp_idf_hal::gpio::AnyIOPin;
/// use esp_idf_hal::prelude::*;
/// use esp_idf_hal::uart::{config::Config, UartDriver};
///
/// let peripherals = Peripherals::take()?;
/// let uart = UartDriver::new(
///     peripherals.uart1,
///     peripherals.pins.gpio6,
///     peripherals.pins.gpio7,
///     Option::<AnyIOPin>::None,
///     Option::<AnyIOPin>::None,
///     &Config::default().baudrate(Hertz(pins::CAM_BAUD)),
/// )?;
/// let camera = Esp32Camera::new(uart, 30);
/// ```
pub struct Esp32Camera<'d> {
    uart: UartDriver<'d>,
    scan_row: u16,
    reply: [u8; FRAME_LEN],
    filled: usize,
    centroid: i32,
}

impl<'d> Esp32Camera<'d> {
    /// Wrap an open UART. `scan_row` goes out with every capture request.
    pub fn new(uart: UartDriver<'d>, scan_row: u16) -> Self {
        Self {
            uart,
            scan_row,
            reply: [0; FRAME_LEN],
            filled: 0,
            centroid: 0,
        }
    }

    fn parse(reply: &[u8; FRAME_LEN]) -> Option<i32> {
        match reply {
            [REPLY, lo, hi] => Some(i16::from_le_bytes([*lo, *hi]) as i32),
            _ => None,
        }
    }
}

impl FrameGrabber for Esp32Camera<'_> {
    fn request_capture(&mut self) {
        self.filled = 0;
        // Drop anything left over from a frame we gave up on
        let mut junk = [0u8; 16];
        while matches!(self.uart.read(&mut junk, NON_BLOCK), Ok(n) if n > 0) {}

        let [lo, hi] = self.scan_row.to_le_bytes();
        if let Err(e) = self.uart.write(&[REQUEST, lo, hi]) {
            log::warn!("camera request failed: {}", e);
        }
    }

    fn is_capture_pending(&mut self) -> bool {
        while self.filled < FRAME_LEN {
            let mut byte = [0u8; 1];
            match self.uart.read(&mut byte, NON_BLOCK) {
                Ok(1) => {
                    // Resynchronize on the reply header
                    if self.filled == 0 && byte[0] != REPLY {
                        continue;
                    }
                    self.reply[self.filled] = byte[0];
                    self.filled += 1;
                }
                _ => return true,
            }
        }
        false
    }

    fn decode_frame(&mut self) {
        match Self::parse(&self.reply) {
            Some(px) => self.centroid = px,
            None => log::warn!("malformed camera reply {:02x?}", self.reply),
        }
    }

    fn line_centroid(&mut self, row: u16) -> i32 {
        if row != self.scan_row {
            log::debug!("centroid asked for row {}, camera scans row {}", row, self.scan_row);
        }
        self.centroid
    }
}
