//! Fade of the active player's zone
//!
//! The fade level is kept as an integer number of steps so repeated updates
//! never drift: level `n` means a fade factor of `n / 20`, bouncing between
//! 0.1 and 1.0.

use crate::animation::{interval_elapsed, scale_color};
use crate::state::RenderState;
use crate::RGB8;

/// Highest fade level, a factor of 1.0
pub const FADE_MAX_STEPS: u8 = 20;

/// Lowest fade level, a factor of 0.1
pub const FADE_MIN_STEPS: u8 = 2;

/// Default highlight update interval
pub const DEFAULT_HIGHLIGHT_INTERVAL_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    Up,
    Down,
}

/// Persists across highlights: picking another player continues the fade
/// where the previous one left off.
#[derive(Debug, Clone)]
pub struct HighlightFader {
    pub last_update_ms: Option<u64>,
    level: u8,
    direction: FadeDirection,
}

impl Default for HighlightFader {
    fn default() -> Self {
        Self {
            last_update_ms: None,
            level: FADE_MAX_STEPS,
            direction: FadeDirection::Down,
        }
    }
}

impl HighlightFader {
    /// Current fade factor in `[0.1, 1.0]`
    #[must_use]
    pub fn fade(&self) -> f32 {
        f32::from(self.level) / f32::from(FADE_MAX_STEPS)
    }

    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    #[must_use]
    pub const fn direction(&self) -> FadeDirection {
        self.direction
    }

    /// Move the fade one step, reversing direction on reaching either bound.
    pub fn advance(&mut self) {
        match self.direction {
            FadeDirection::Down => {
                self.level = self.level.saturating_sub(1).max(FADE_MIN_STEPS);
                if self.level == FADE_MIN_STEPS {
                    self.direction = FadeDirection::Up;
                }
            }
            FadeDirection::Up => {
                self.level = (self.level + 1).min(FADE_MAX_STEPS);
                if self.level == FADE_MAX_STEPS {
                    self.direction = FadeDirection::Down;
                }
            }
        }
    }

    /// Repaint the active zone with the player's color scaled by the next
    /// fade level. Pixels outside the zone are left alone. Returns `false`
    /// without touching anything while the interval has not elapsed or no
    /// player is active.
    pub fn step(
        &mut self,
        now_ms: u64,
        interval_ms: u32,
        state: &RenderState,
        pixels: &mut [RGB8],
    ) -> bool {
        let Some(player) = state.active_player() else {
            return false;
        };
        if !interval_elapsed(self.last_update_ms, now_ms, interval_ms) {
            return false;
        }
        self.last_update_ms = Some(now_ms);
        self.advance();

        let Some(zone) = state.active_zone(pixels.len()) else {
            return false;
        };
        let color = state.player_color(player).unwrap_or_default();
        pixels[zone.range()].fill(scale_color(color, self.fade()));
        true
    }
}
