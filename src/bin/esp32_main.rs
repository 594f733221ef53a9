//! ESP32-C3 SuperMini line follower.
//!
//! This is the main entry point for the physical robot. It runs the control
//! loop at the configured period (100 ms by default), each iteration:
//! - Asks the camera co-processor for the line centroid
//! - Reads the gain potentiometer
//! - Updates both motor PWM outputs
//! - Polls the mode button and renders telemetry (if the display is enabled)
//!
//! # Configuration
//!
//! Defaults are compiled in. Set `LINEFOLLOW_CONFIG` to a JSON object at build
//! time to override any subset of them, e.g.
//!
//! ```bash
//! LINEFOLLOW_CONFIG='{"steering":{"base_speed":0.5},"sensor":{"capture_timeout_ms":250}}' \
//!     cargo build --release --features esp32,display
//! ```
//!
//! # Build
//!
//! ```bash
//! # Basic (motors + camera + knob + button)
//! cargo build --release --features esp32
//!
//! # With OLED telemetry
//! cargo build --release --features esp32,display
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use rs_linefollow::hal::esp32::{pins, Esp32Button, Esp32Camera, Esp32Clock, Esp32Knob, Esp32Pwm};
use rs_linefollow::{Config, ControlLoop};

fn load_config() -> anyhow::Result<Config> {
    match option_env!("LINEFOLLOW_CONFIG") {
        Some(json) => {
            let config = Config::from_json(json.as_bytes())?;
            log::info!("using LINEFOLLOW_CONFIG overrides");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("================================");
    log::info!("  rs-linefollow SuperMini");
    log::info!("================================");

    let config = load_config()?;
    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Motor PWM (LEDC on GPIO2/3)
    // =========================================================================
    let pwm = Esp32Pwm::new(
        peripherals.pins.gpio2,
        peripherals.pins.gpio3,
        peripherals.ledc.timer0,
        peripherals.ledc.channel0,
        peripherals.ledc.channel1,
        &config.pwm.timing,
    )?;
    log::info!("[OK] Motor PWM (GPIO{}/{})", pins::LEFT_PWM, pins::RIGHT_PWM);

    // =========================================================================
    // Camera co-processor (UART1 on GPIO6/7)
    // =========================================================================
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::CAM_BAUD)),
    )?;
    let camera = Esp32Camera::new(uart, config.sensor.scan_row);
    log::info!("[OK] Camera link (GPIO{}/{})", pins::CAM_TX, pins::CAM_RX);

    // =========================================================================
    // Gain knob (ADC1 on GPIO4) and mode button (GPIO10)
    // =========================================================================
    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let knob = Esp32Knob::new(&adc1, peripherals.pins.gpio4)?;
    let button = Esp32Button::new(peripherals.pins.gpio10)?;
    log::info!("[OK] Gain knob (GPIO{}), mode button (GPIO{})", pins::GAIN_POT, pins::MODE_BUTTON);

    let control = ControlLoop::new(config, camera, knob, pwm, Esp32Clock::new(), FreeRtos)?
        .with_mode_button(button);

    // =========================================================================
    // Display (SSD1306 on GPIO8/9) - Optional
    // =========================================================================
    #[cfg(feature = "display")]
    let mut control = {
        use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
        use rs_linefollow::hal::esp32::Esp32Display;

        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio8, // SDA
            peripherals.pins.gpio9, // SCL
            &I2cConfig::new().baudrate(400.kHz().into()),
        )?;
        let display =
            Esp32Display::new(i2c).map_err(|e| anyhow::anyhow!("Display init failed: {:?}", e))?;
        log::info!("[OK] Display (GPIO{}/{} I2C)", pins::I2C_SDA, pins::I2C_SCL);
        control.with_telemetry(display)
    };

    #[cfg(not(feature = "display"))]
    let mut control = control;

    control.splash();
    FreeRtos::delay_ms(1000);

    control.run()
}
