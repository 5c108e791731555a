//! WS2812 strip output
//!
//! Brightness and gamma are applied here at flush time, so the engine's
//! buffer always holds the unscaled colors.

use std::thread::sleep;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{RmtChannel, TxRmtDriver};
use gametable_zones::ShowStep;
use log::debug;
use smart_leds::{brightness, gamma, SmartLedsWrite, RGB8};
use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

pub struct LedController {
    driver: Ws2812Esp32Rmt<'static>,
    gamma_correction: bool,
}

impl LedController {
    pub fn new<C: RmtChannel, P: OutputPin>(
        pin: impl Peripheral<P = P> + 'static,
        channel: impl Peripheral<P = C> + 'static,
        gamma_correction: bool,
    ) -> Result<Self> {
        debug!("Creating LED controller (gamma correction: {gamma_correction})");
        // Extra memory blocks keep the RMT fed while WiFi interrupts are busy.
        // See: https://github.com/cat-in-136/ws2812-esp32-rmt-driver#the-led-is-sp32-flickers-sp32--sp32-s3--sp32-c6--sp32-h2
        let config = TransmitConfig::new().clock_divider(1).mem_block_num(4);
        let tx_driver = TxRmtDriver::new(channel, pin, &config)?;
        let driver = Ws2812Esp32Rmt::new_with_rmt_driver(tx_driver)?;

        Ok(Self {
            driver,
            gamma_correction,
        })
    }

    /// Push `pixels` to the strip, scaled by `level` (0-255).
    pub fn write(&mut self, pixels: &[RGB8], level: u8) -> Result<()> {
        // Gamma first, then brightness, as recommended by smart-leds docs
        if self.gamma_correction {
            self.driver
                .write(brightness(gamma(pixels.iter().copied()), level))?;
        } else {
            self.driver.write(brightness(pixels.iter().copied(), level))?;
        }
        Ok(())
    }

    /// Play a blocking sequence of show steps. Only used before the poll
    /// loop starts.
    pub fn play_show(&mut self, steps: &[ShowStep], led_count: usize, level: u8) -> Result<()> {
        let mut pixels = vec![RGB8::default(); led_count];
        for step in steps {
            step.paint(&mut pixels);
            self.write(&pixels, level)?;
            sleep(Duration::from_millis(u64::from(step.hold_ms)));
        }
        Ok(())
    }

    /// Blink the whole strip `times` times (blocking).
    pub fn blink(
        &mut self,
        color: RGB8,
        times: usize,
        period: Duration,
        led_count: usize,
        level: u8,
    ) -> Result<()> {
        let on = vec![color; led_count];
        let off = vec![RGB8::default(); led_count];

        for _ in 0..times {
            self.write(&on, level)?;
            sleep(period);
            self.write(&off, level)?;
            sleep(period);
        }
        Ok(())
    }
}
