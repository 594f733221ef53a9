//! ESP32-C3 SuperMini hardware abstraction layer for the line follower.
//!
//! This module provides hardware implementations for the ESP32-C3 SuperMini
//! board driving a two-motor chassis.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash)
//! - **Motor Driver**: dual H-bridge, one PWM input per wheel
//! - **Camera**: line-extraction co-processor on UART1
//! - **Gain Knob**: 10k potentiometer on ADC1
//! - **Mode Button**: momentary switch to 3.3V
//! - **Display**: SSD1306 128x64 OLED (I2C)
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments matching the SuperMini layout.

mod button;
mod camera;
mod clock;
mod knob;
mod pwm;

pub use button::Esp32Button;
pub use camera::Esp32Camera;
pub use clock::Esp32Clock;
pub use knob::Esp32Knob;
pub use pwm::Esp32Pwm;

#[cfg(feature = "display")]
mod display;
#[cfg(feature = "display")]
pub use display::{DisplayError, Esp32Display};

/// Pin assignments for SuperMini ESP32-C3.
///
/// - Motor PWM on GPIO2, 3
/// - Gain potentiometer on GPIO4
/// - Camera link on GPIO6, 7
/// - I2C display on GPIO8, 9
/// - Mode button on GPIO10
pub mod pins {
    // =========================================================================
    // Motor Driver
    // =========================================================================

    /// Left motor PWM (IN1)
    pub const LEFT_PWM: i32 = 2;

    /// Right motor PWM (IN2)
    pub const RIGHT_PWM: i32 = 3;

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Gain potentiometer wiper (ADC1 channel 4)
    pub const GAIN_POT: i32 = 4;

    /// Mode button (active high, internal pull-down)
    pub const MODE_BUTTON: i32 = 10;

    // =========================================================================
    // Camera Co-processor (UART1)
    // =========================================================================

    /// UART TX to the camera board
    pub const CAM_TX: i32 = 6;

    /// UART RX from the camera board
    pub const CAM_RX: i32 = 7;

    /// Camera link baud rate
    pub const CAM_BAUD: u32 = 115_200;

    // =========================================================================
    // I2C Display (SSD1306)
    // =========================================================================

    /// I2C data line (also has onboard blue LED - will flicker during I2C)
    pub const I2C_SDA: i32 = 8;

    /// I2C clock line (also shared with BOOT button - only affects programming)
    pub const I2C_SCL: i32 = 9;

    /// Default I2C address for SSD1306 OLED
    pub const OLED_I2C_ADDR: u8 = 0x3C;
}
