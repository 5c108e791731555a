//! Timed whole-strip animations
//!
//! Each animation keeps its own timer and phase in [`AnimationTimers`] and
//! only touches the buffer once its interval has elapsed. Switching to another
//! animation leaves the other timers where they were; they simply stop
//! advancing until selected again.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use smart_leds::hsv::{hsv2rgb, Hsv};

use crate::RGB8;

/// Rainbow update interval
pub const RAINBOW_INTERVAL_MS: u32 = 20;

/// Hue advance per rainbow update, on a 16-bit hue circle
pub const RAINBOW_HUE_STEP: u16 = 256;

/// Default theater chase update interval
pub const DEFAULT_THEATER_CHASE_INTERVAL_MS: u32 = 50;

/// Breathing update interval
pub const BREATHING_INTERVAL_MS: u32 = 30;

/// Phase advance per breathing update (radians)
pub const BREATHING_PHASE_STEP: f32 = 0.05;

/// Lowest breathing scale; the strip never goes fully dark
pub const BREATHING_MIN_SCALE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Rainbow,
    TheaterChase,
    Breathing,
}

impl Animation {
    /// Look up an animation by its web name (`rainbow`, `theater_chase`,
    /// `breathing`). Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rainbow" => Some(Self::Rainbow),
            "theater_chase" => Some(Self::TheaterChase),
            "breathing" => Some(Self::Breathing),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rainbow => "rainbow",
            Self::TheaterChase => "theater_chase",
            Self::Breathing => "breathing",
        }
    }
}

/// Whether `interval_ms` has passed since `last_ms`. Never-run timers fire
/// immediately.
#[inline]
pub(crate) fn interval_elapsed(last_ms: Option<u64>, now_ms: u64, interval_ms: u32) -> bool {
    last_ms.map_or(true, |last| now_ms.saturating_sub(last) >= u64::from(interval_ms))
}

/// Multiply each channel by `scale` (expected in `[0.0, 1.0]`).
#[must_use]
pub fn scale_color(color: RGB8, scale: f32) -> RGB8 {
    let scale = scale.clamp(0.0, 1.0);
    // Channel * scale stays within [0.0, 255.0]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let channel = |c: u8| (f32::from(c) * scale).round() as u8;
    RGB8::new(channel(color.r), channel(color.g), channel(color.b))
}

/// Fully saturated color at a position on the 16-bit hue circle
#[must_use]
pub fn rainbow_color(hue: u16) -> RGB8 {
    let [hue, _] = hue.to_be_bytes();
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: 255,
    })
}

/// Breathing brightness for a phase in radians: `(sin + 1) / 2`, mapped onto
/// `[0.3, 1.0]`.
#[must_use]
pub fn breathing_scale(phase: f32) -> f32 {
    let wave = (phase.sin() + 1.0) / 2.0;
    (wave * (1.0 - BREATHING_MIN_SCALE) + BREATHING_MIN_SCALE).clamp(BREATHING_MIN_SCALE, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct RainbowTimer {
    pub last_update_ms: Option<u64>,
    /// Hue of pixel 0; wraps around the 16-bit hue circle
    pub hue_offset: u16,
}

impl RainbowTimer {
    /// Spread the full hue circle across the strip, starting at the current
    /// offset, then advance the offset.
    pub fn step(&mut self, now_ms: u64, pixels: &mut [RGB8]) -> bool {
        if !interval_elapsed(self.last_update_ms, now_ms, RAINBOW_INTERVAL_MS) {
            return false;
        }
        self.last_update_ms = Some(now_ms);

        let count = pixels.len() as u64;
        for (i, pixel) in pixels.iter_mut().enumerate() {
            // i < count, so the spread stays below 65536
            #[allow(clippy::cast_possible_truncation)]
            let spread = ((i as u64 * 65_536) / count) as u16;
            *pixel = rainbow_color(self.hue_offset.wrapping_add(spread));
        }

        self.hue_offset = self.hue_offset.wrapping_add(RAINBOW_HUE_STEP);
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct TheaterChaseTimer {
    pub last_update_ms: Option<u64>,
    /// Which pixel of every group of three is lit (0..3)
    pub offset: u8,
}

impl TheaterChaseTimer {
    /// Light every third pixel starting at the current offset, everything
    /// else off, then move the offset along.
    pub fn step(&mut self, now_ms: u64, interval_ms: u32, pixels: &mut [RGB8], color: RGB8) -> bool {
        if !interval_elapsed(self.last_update_ms, now_ms, interval_ms) {
            return false;
        }
        self.last_update_ms = Some(now_ms);

        let offset = usize::from(self.offset);
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = if i % 3 == offset {
                color
            } else {
                RGB8::default()
            };
        }

        self.offset = (self.offset + 1) % 3;
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct BreathingTimer {
    pub last_update_ms: Option<u64>,
    /// Phase in radians, kept within `[0, 2π)`
    pub phase: f32,
}

impl BreathingTimer {
    /// Advance the phase and fill the strip with the scaled color.
    pub fn step(&mut self, now_ms: u64, pixels: &mut [RGB8], color: RGB8) -> bool {
        if !interval_elapsed(self.last_update_ms, now_ms, BREATHING_INTERVAL_MS) {
            return false;
        }
        self.last_update_ms = Some(now_ms);

        self.phase += BREATHING_PHASE_STEP;
        if self.phase >= TAU {
            self.phase -= TAU;
        }

        pixels.fill(scale_color(color, breathing_scale(self.phase)));
        true
    }
}

/// Timer state of all three animations
#[derive(Debug, Clone, Default)]
pub struct AnimationTimers {
    pub rainbow: RainbowTimer,
    pub theater_chase: TheaterChaseTimer,
    pub breathing: BreathingTimer,
}
