//! Render state shared by the web interface and the renderers
//!
//! All clamping rules live here so every mutation path (web route, preview
//! tool, tests) goes through the same checks. Repainting the buffer after a
//! mutation is the engine's job.

use log::debug;

use crate::animation::Animation;
use crate::command::PlayerDelta;
use crate::zones::{partition, Zone};
use crate::{MAX_PLAYERS, RGB8};

/// Preset colors for the eight player slots
pub const DEFAULT_PLAYER_COLORS: [RGB8; MAX_PLAYERS] = [
    RGB8::new(255, 0, 0),
    RGB8::new(0, 255, 0),
    RGB8::new(0, 0, 255),
    RGB8::new(255, 255, 0),
    RGB8::new(255, 0, 255),
    RGB8::new(0, 255, 255),
    RGB8::new(255, 128, 0),
    RGB8::new(128, 0, 255),
];

pub const DEFAULT_BRIGHTNESS: u8 = 50;
pub const DEFAULT_THEATER_CHASE_COLOR: RGB8 = RGB8::new(255, 255, 255);
pub const DEFAULT_BREATHING_COLOR: RGB8 = RGB8::new(0, 0, 255);

/// What the strip shows on top of the static zones.
///
/// Highlighting a player and running an animation exclude each other, so both
/// are folded into one value instead of two independent fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Static zones only
    #[default]
    Idle,
    /// Fade the zone of this player (1-based)
    Highlighting(u8),
    /// Run an animation over the whole strip
    Animating(Animation),
}

#[derive(Debug, Clone)]
pub struct RenderState {
    player_count: u8,
    player_colors: [RGB8; MAX_PLAYERS],
    brightness: u8,
    selection: Selection,
    theater_chase_color: RGB8,
    breathing_color: RGB8,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            player_count: 1,
            player_colors: DEFAULT_PLAYER_COLORS,
            brightness: DEFAULT_BRIGHTNESS,
            selection: Selection::Idle,
            theater_chase_color: DEFAULT_THEATER_CHASE_COLOR,
            breathing_color: DEFAULT_BREATHING_COLOR,
        }
    }
}

impl RenderState {
    #[must_use]
    pub const fn player_count(&self) -> u8 {
        self.player_count
    }

    #[must_use]
    pub const fn player_colors(&self) -> &[RGB8; MAX_PLAYERS] {
        &self.player_colors
    }

    /// Color of a 1-based player slot
    #[must_use]
    pub fn player_color(&self, player: u8) -> Option<RGB8> {
        let slot = usize::from(player).checked_sub(1)?;
        self.player_colors.get(slot).copied()
    }

    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Highlighted player, `None` when no player is active
    #[must_use]
    pub const fn active_player(&self) -> Option<u8> {
        match self.selection {
            Selection::Highlighting(player) => Some(player),
            _ => None,
        }
    }

    /// Running animation, `None` for static rendering
    #[must_use]
    pub const fn animation(&self) -> Option<Animation> {
        match self.selection {
            Selection::Animating(animation) => Some(animation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn theater_chase_color(&self) -> RGB8 {
        self.theater_chase_color
    }

    #[must_use]
    pub const fn breathing_color(&self) -> RGB8 {
        self.breathing_color
    }

    /// Zone of the active player on a strip of `led_count` LEDs.
    ///
    /// Derived on every call so it can never go stale.
    #[must_use]
    pub fn active_zone(&self, led_count: usize) -> Option<Zone> {
        let player = self.active_player()?;
        partition(led_count, self.player_count)
            .get(usize::from(player) - 1)
            .copied()
    }

    /// Add or remove one player, staying within `1..=MAX_PLAYERS`.
    ///
    /// Returns `false` when the count was already at the limit. An active
    /// player beyond the new count is cleared.
    pub fn adjust_player_count(&mut self, delta: PlayerDelta) -> bool {
        #[allow(clippy::cast_possible_truncation)]
        let max = MAX_PLAYERS as u8;
        let new_count = match delta {
            PlayerDelta::Increment => self.player_count.saturating_add(1).min(max),
            PlayerDelta::Decrement => self.player_count.saturating_sub(1).max(1),
        };

        if new_count == self.player_count {
            debug!("Player count stays at {new_count}");
            return false;
        }

        debug!("Player count {} -> {new_count}", self.player_count);
        self.player_count = new_count;

        if let Selection::Highlighting(player) = self.selection {
            if player > new_count {
                debug!("Active player {player} no longer seated, clearing");
                self.selection = Selection::Idle;
            }
        }
        true
    }

    /// Highlight `player` if it is seated, otherwise clear the highlight.
    ///
    /// Selecting a seated player replaces a running animation. Clearing only
    /// affects the highlight; an animation keeps running.
    pub fn set_active_player(&mut self, player: Option<u8>) {
        match player.filter(|p| (1..=self.player_count).contains(p)) {
            Some(player) => {
                debug!("Active player: {player}");
                self.selection = Selection::Highlighting(player);
            }
            None => {
                if matches!(self.selection, Selection::Highlighting(_)) {
                    debug!("Active player cleared");
                    self.selection = Selection::Idle;
                }
            }
        }
    }

    /// Switch animation. Starting one always clears the active player;
    /// `None` stops a running animation without bringing a highlight back.
    pub fn start_animation(&mut self, animation: Option<Animation>) {
        match animation {
            Some(animation) => {
                debug!("Animation started: {animation:?}");
                self.selection = Selection::Animating(animation);
            }
            None => {
                if matches!(self.selection, Selection::Animating(_)) {
                    debug!("Animation stopped");
                    self.selection = Selection::Idle;
                }
            }
        }
    }

    /// Set the color of a zero-based player slot. Returns `false` for a slot
    /// outside `0..MAX_PLAYERS`.
    pub fn set_player_color(&mut self, slot: usize, color: RGB8) -> bool {
        match self.player_colors.get_mut(slot) {
            Some(entry) => {
                *entry = color;
                true
            }
            None => {
                debug!("Ignoring color for player slot {slot}");
                false
            }
        }
    }

    pub fn set_theater_chase_color(&mut self, color: RGB8) {
        self.theater_chase_color = color;
    }

    pub fn set_breathing_color(&mut self, color: RGB8) {
        self.breathing_color = color;
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Drop both the highlight and any animation.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_players(count: u8) -> RenderState {
        let mut state = RenderState::default();
        for _ in 1..count {
            state.adjust_player_count(PlayerDelta::Increment);
        }
        assert_eq!(state.player_count(), count);
        state
    }

    fn assert_active_player_valid(state: &RenderState) {
        if let Some(player) = state.active_player() {
            assert!(
                (1..=state.player_count()).contains(&player),
                "active player {player} outside 1..={}",
                state.player_count()
            );
        }
    }

    #[test]
    fn test_defaults() {
        let state = RenderState::default();
        assert_eq!(state.player_count(), 1);
        assert_eq!(state.brightness(), 50);
        assert_eq!(state.active_player(), None);
        assert_eq!(state.animation(), None);
        assert_eq!(state.player_colors(), &DEFAULT_PLAYER_COLORS);
    }

    #[test]
    fn test_decrement_at_one_is_noop() {
        let mut state = RenderState::default();
        assert!(!state.adjust_player_count(PlayerDelta::Decrement));
        assert_eq!(state.player_count(), 1);
    }

    #[test]
    fn test_increment_clamps_at_max() {
        let mut state = with_players(8);
        assert!(!state.adjust_player_count(PlayerDelta::Increment));
        assert_eq!(state.player_count(), 8);
    }

    #[test]
    fn test_shrinking_below_active_player_clears_it() {
        let mut state = with_players(4);
        state.set_active_player(Some(4));
        assert_eq!(state.active_player(), Some(4));

        state.adjust_player_count(PlayerDelta::Decrement);
        assert_eq!(state.player_count(), 3);
        assert_eq!(state.active_player(), None);
        assert_eq!(state.selection(), Selection::Idle);
    }

    #[test]
    fn test_shrinking_keeps_lower_active_player() {
        let mut state = with_players(4);
        state.set_active_player(Some(2));
        state.adjust_player_count(PlayerDelta::Decrement);
        assert_eq!(state.active_player(), Some(2));
    }

    #[test]
    fn test_active_player_validation() {
        let mut state = with_players(3);

        state.set_active_player(Some(3));
        assert_eq!(state.active_player(), Some(3));

        state.set_active_player(Some(0));
        assert_eq!(state.active_player(), None);

        state.set_active_player(Some(2));
        state.set_active_player(Some(4));
        assert_eq!(state.active_player(), None);

        state.set_active_player(Some(1));
        state.set_active_player(None);
        assert_eq!(state.active_player(), None);
    }

    #[test]
    fn test_active_player_stays_valid_across_mutations() {
        let mut state = RenderState::default();
        // Walk a player count up and down while poking the highlight
        for step in 0..64u8 {
            let delta = if (step / 8) % 2 == 0 {
                PlayerDelta::Increment
            } else {
                PlayerDelta::Decrement
            };
            state.set_active_player(Some(step % 10));
            assert_active_player_valid(&state);
            state.adjust_player_count(delta);
            assert_active_player_valid(&state);
            if step % 7 == 0 {
                state.start_animation(Some(Animation::Rainbow));
                assert_active_player_valid(&state);
            }
        }
    }

    #[test]
    fn test_starting_animation_clears_active_player() {
        for animation in [Animation::Rainbow, Animation::TheaterChase, Animation::Breathing] {
            let mut state = with_players(2);
            state.set_active_player(Some(2));
            state.start_animation(Some(animation));
            assert_eq!(state.active_player(), None);
            assert_eq!(state.animation(), Some(animation));
        }
    }

    #[test]
    fn test_stopping_animation_does_not_resume_highlight() {
        let mut state = with_players(2);
        state.set_active_player(Some(1));
        state.start_animation(Some(Animation::Breathing));
        state.start_animation(None);
        assert_eq!(state.selection(), Selection::Idle);
    }

    #[test]
    fn test_stopping_animation_keeps_existing_highlight() {
        let mut state = with_players(2);
        state.set_active_player(Some(1));
        state.start_animation(None);
        assert_eq!(state.active_player(), Some(1));
    }

    #[test]
    fn test_clearing_player_keeps_animation() {
        let mut state = with_players(2);
        state.start_animation(Some(Animation::TheaterChase));
        state.set_active_player(Some(0));
        assert_eq!(state.animation(), Some(Animation::TheaterChase));
    }

    #[test]
    fn test_active_zone_single_player_is_whole_strip() {
        let mut state = RenderState::default();
        state.set_active_player(Some(1));
        assert_eq!(state.active_zone(60), Some(Zone { start: 0, len: 60 }));
        assert_eq!(state.active_zone(60).and_then(|z| z.last()), Some(59));
    }

    #[test]
    fn test_active_zone_follows_player_count() {
        let mut state = with_players(3);
        state.set_active_player(Some(2));
        assert_eq!(state.active_zone(50), Some(Zone { start: 17, len: 17 }));

        state.adjust_player_count(PlayerDelta::Increment);
        // 50 / 4 = 12 remainder 2 -> 13, 13, 12, 12
        assert_eq!(state.active_zone(50), Some(Zone { start: 13, len: 13 }));

        state.set_active_player(None);
        assert_eq!(state.active_zone(50), None);
    }

    #[test]
    fn test_player_color_slots() {
        let mut state = RenderState::default();
        assert!(state.set_player_color(7, RGB8::new(1, 2, 3)));
        assert!(!state.set_player_color(8, RGB8::new(1, 2, 3)));
        assert_eq!(state.player_color(8), Some(RGB8::new(1, 2, 3)));
        assert_eq!(state.player_color(0), None);
        assert_eq!(state.player_color(9), None);
    }
}
