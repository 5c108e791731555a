//! Boot-time light show spelling out the last octet of the station IP
//!
//! Digits are shown most significant first: `digit` white LEDs, then a dark
//! gap. A zero is a single red LED. The firmware plays the steps with
//! blocking delays before the poll loop starts.

use crate::RGB8;

pub const DIGIT_COLOR: RGB8 = RGB8::new(255, 255, 255);
pub const ZERO_COLOR: RGB8 = RGB8::new(255, 0, 0);

pub const DIGIT_HOLD_MS: u32 = 1000;
pub const DIGIT_GAP_MS: u32 = 400;
pub const FINAL_PAUSE_MS: u32 = 1500;

/// Light the first `lit` LEDs in `color` (everything else off) and hold for
/// `hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowStep {
    pub lit: usize,
    pub color: RGB8,
    pub hold_ms: u32,
}

impl ShowStep {
    const fn dark(hold_ms: u32) -> Self {
        Self {
            lit: 0,
            color: RGB8::new(0, 0, 0),
            hold_ms,
        }
    }

    /// Render this step into `pixels`.
    pub fn paint(&self, pixels: &mut [RGB8]) {
        let lit = self.lit.min(pixels.len());
        pixels[..lit].fill(self.color);
        pixels[lit..].fill(RGB8::default());
    }
}

#[must_use]
pub fn ip_show_steps(octet: u8) -> Vec<ShowStep> {
    let digits = octet.to_string();
    let mut steps = Vec::with_capacity(digits.len() * 2 + 1);

    for digit in digits.bytes().map(|b| b - b'0') {
        let step = if digit == 0 {
            ShowStep {
                lit: 1,
                color: ZERO_COLOR,
                hold_ms: DIGIT_HOLD_MS,
            }
        } else {
            ShowStep {
                lit: usize::from(digit),
                color: DIGIT_COLOR,
                hold_ms: DIGIT_HOLD_MS,
            }
        };
        steps.push(step);
        steps.push(ShowStep::dark(DIGIT_GAP_MS));
    }

    steps.push(ShowStep::dark(FINAL_PAUSE_MS));
    steps
}
