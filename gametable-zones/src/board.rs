//! Limits of the ESP32 board the strip is wired to
//!
//! Stored settings are checked against these before boot touches the
//! hardware, so a bad value can never keep the web interface from starting.

/// Longest strip the firmware will drive
pub const MAX_LED_COUNT: usize = 1024;

/// Output-capable GPIOs of the ESP32. 6..=11 belong to the SPI flash and
/// 34..=39 are input only.
const LED_GPIOS: &[u8] = &[
    0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

/// Whether `pin` can drive the strip's data line
#[must_use]
pub fn is_led_gpio(pin: u8) -> bool {
    LED_GPIOS.contains(&pin)
}
