//! The render engine: state, pixel buffer and all timers in one place
//!
//! The owner of the [`Engine`] drives it from a single loop: [`Engine::apply`]
//! for incoming commands and [`Engine::tick`] once per iteration. Both return
//! whether the buffer changed and should be flushed to the strip.

use log::{debug, info};
use serde::Serialize;

use crate::animation::{AnimationTimers, DEFAULT_THEATER_CHASE_INTERVAL_MS};
use crate::command::{AnimationColorUpdate, Command};
use crate::form::format_hex_color;
use crate::highlight::{HighlightFader, DEFAULT_HIGHLIGHT_INTERVAL_MS};
use crate::state::{RenderState, Selection};
use crate::zones::paint_zones;
use crate::{Animation, RGB8};

const RESET_COLOR: RGB8 = RGB8::new(255, 255, 255);

/// Configurable update intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimings {
    pub theater_chase_interval_ms: u32,
    pub highlight_interval_ms: u32,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            theater_chase_interval_ms: DEFAULT_THEATER_CHASE_INTERVAL_MS,
            highlight_interval_ms: DEFAULT_HIGHLIGHT_INTERVAL_MS,
        }
    }
}

/// Serializable view of the render state for the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub led_count: usize,
    pub player_count: u8,
    pub player_colors: Vec<String>,
    pub brightness: u8,
    pub active_player: Option<u8>,
    /// First and last LED of the active zone, both inclusive
    pub active_zone: Option<(usize, usize)>,
    pub animation: Option<Animation>,
    pub theater_chase_color: String,
    pub breathing_color: String,
}

pub struct Engine {
    state: RenderState,
    pixels: Vec<RGB8>,
    timers: AnimationTimers,
    fader: HighlightFader,
    timings: EngineTimings,
}

impl Engine {
    /// Create an engine with default state and the zones already painted.
    #[must_use]
    pub fn new(led_count: usize, timings: EngineTimings) -> Self {
        let mut engine = Self {
            state: RenderState::default(),
            pixels: vec![RGB8::default(); led_count],
            timers: AnimationTimers::default(),
            fader: HighlightFader::default(),
            timings,
        };
        engine.repaint_zones();
        engine
    }

    #[must_use]
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    #[must_use]
    pub fn led_count(&self) -> usize {
        self.pixels.len()
    }

    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.state.brightness()
    }

    #[must_use]
    pub const fn state(&self) -> &RenderState {
        &self.state
    }

    #[must_use]
    pub const fn timers(&self) -> &AnimationTimers {
        &self.timers
    }

    #[must_use]
    pub const fn fader(&self) -> &HighlightFader {
        &self.fader
    }

    #[must_use]
    pub const fn timings(&self) -> EngineTimings {
        self.timings
    }

    fn repaint_zones(&mut self) {
        paint_zones(
            &mut self.pixels,
            self.state.player_count(),
            self.state.player_colors(),
        );
    }

    /// Apply one command. Returns `true` when the strip needs a flush.
    pub fn apply(&mut self, command: Command) -> bool {
        debug!("Applying {command:?}");
        match command {
            Command::AdjustPlayers(delta) => {
                if !self.state.adjust_player_count(delta) {
                    return false;
                }
                self.repaint_zones();
                true
            }
            Command::SetBrightness(brightness) => {
                // Brightness is applied at flush time, the buffer stays as is
                self.state.set_brightness(brightness);
                true
            }
            Command::SetActivePlayer(player) => {
                self.state.set_active_player(player);
                self.repaint_zones();
                true
            }
            Command::SetPlayerColors(colors) => {
                let mut assigned = false;
                for (slot, color) in colors {
                    assigned |= self.state.set_player_color(slot, color);
                }
                if assigned {
                    self.repaint_zones();
                }
                assigned
            }
            Command::SetAnimationColors(update) => self.set_animation_colors(update),
            Command::StartAnimation(animation) => {
                self.state.start_animation(animation);
                match animation {
                    // The animation paints itself on the next tick
                    Some(_) => false,
                    None => {
                        self.repaint_zones();
                        true
                    }
                }
            }
            Command::ResetAll => {
                info!("Reset: all LEDs white");
                self.state.clear_selection();
                self.pixels.fill(RESET_COLOR);
                true
            }
        }
    }

    fn set_animation_colors(&mut self, update: AnimationColorUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(color) = update.theater_chase {
            self.state.set_theater_chase_color(color);
        }
        if let Some(color) = update.breathing {
            self.state.set_breathing_color(color);
        }
        self.repaint_zones();
        true
    }

    /// Run one scheduler step at `now_ms`: the selected animation, the
    /// highlight fader, or nothing. Returns `true` when something was painted.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.state.selection() {
            Selection::Idle => false,
            Selection::Highlighting(_) => self.fader.step(
                now_ms,
                self.timings.highlight_interval_ms,
                &self.state,
                &mut self.pixels,
            ),
            Selection::Animating(Animation::Rainbow) => {
                self.timers.rainbow.step(now_ms, &mut self.pixels)
            }
            Selection::Animating(Animation::TheaterChase) => self.timers.theater_chase.step(
                now_ms,
                self.timings.theater_chase_interval_ms,
                &mut self.pixels,
                self.state.theater_chase_color(),
            ),
            Selection::Animating(Animation::Breathing) => {
                self.timers
                    .breathing
                    .step(now_ms, &mut self.pixels, self.state.breathing_color())
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            led_count: self.led_count(),
            player_count: self.state.player_count(),
            player_colors: self
                .state
                .player_colors()
                .iter()
                .copied()
                .map(format_hex_color)
                .collect(),
            brightness: self.state.brightness(),
            active_player: self.state.active_player(),
            active_zone: self
                .state
                .active_zone(self.led_count())
                .and_then(|zone| Some((zone.start, zone.last()?))),
            animation: self.state.animation(),
            theater_chase_color: format_hex_color(self.state.theater_chase_color()),
            breathing_color: format_hex_color(self.state.breathing_color()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PlayerDelta;
    use crate::state::{DEFAULT_BREATHING_COLOR, DEFAULT_PLAYER_COLORS, DEFAULT_THEATER_CHASE_COLOR};

    fn engine(led_count: usize) -> Engine {
        Engine::new(led_count, EngineTimings::default())
    }

    fn engine_with_players(led_count: usize, players: u8) -> Engine {
        let mut engine = engine(led_count);
        for _ in 1..players {
            engine.apply(Command::AdjustPlayers(PlayerDelta::Increment));
        }
        engine
    }

    #[test]
    fn test_new_paints_single_zone() {
        let engine = engine(12);
        assert!(engine.pixels().iter().all(|&p| p == DEFAULT_PLAYER_COLORS[0]));
        assert_eq!(engine.brightness(), 50);
    }

    #[test]
    fn test_adjust_players_repaints() {
        let mut engine = engine(10);
        assert!(engine.apply(Command::AdjustPlayers(PlayerDelta::Increment)));
        assert_eq!(engine.pixels()[0], DEFAULT_PLAYER_COLORS[0]);
        assert_eq!(engine.pixels()[9], DEFAULT_PLAYER_COLORS[1]);
    }

    #[test]
    fn test_decrement_at_one_needs_no_flush() {
        let mut engine = engine(10);
        engine.apply(Command::ResetAll);
        assert!(!engine.apply(Command::AdjustPlayers(PlayerDelta::Decrement)));
        // Nothing repainted, the reset white is still there
        assert!(engine.pixels().iter().all(|&p| p == RESET_COLOR));
    }

    #[test]
    fn test_brightness_keeps_buffer() {
        let mut engine = engine(4);
        let before = engine.pixels().to_vec();
        assert!(engine.apply(Command::SetBrightness(200)));
        assert_eq!(engine.brightness(), 200);
        assert_eq!(engine.pixels(), before.as_slice());
    }

    #[test]
    fn test_player_colors_partial_update() {
        let mut engine = engine_with_players(4, 2);
        let color = RGB8::new(10, 20, 30);
        assert!(engine.apply(Command::SetPlayerColors(vec![(1, color)])));
        assert_eq!(engine.pixels()[0], DEFAULT_PLAYER_COLORS[0]);
        assert_eq!(engine.pixels()[3], color);
    }

    #[test]
    fn test_player_colors_nothing_assigned() {
        let mut engine = engine(4);
        assert!(!engine.apply(Command::SetPlayerColors(vec![])));
        assert!(!engine.apply(Command::SetPlayerColors(vec![(8, RGB8::default())])));
    }

    #[test]
    fn test_theater_chase_color_only() {
        let mut engine = engine(4);
        let green = RGB8::new(0, 255, 0);
        assert!(engine.apply(Command::SetAnimationColors(AnimationColorUpdate {
            theater_chase: Some(green),
            breathing: None,
        })));
        assert_eq!(engine.state().theater_chase_color(), green);
        assert_eq!(engine.state().breathing_color(), DEFAULT_BREATHING_COLOR);
        assert_eq!(engine.state().player_colors(), &DEFAULT_PLAYER_COLORS);
        assert!(!engine.apply(Command::SetAnimationColors(AnimationColorUpdate::default())));
    }

    #[test]
    fn test_idle_tick_paints_nothing() {
        let mut engine = engine(4);
        assert!(!engine.tick(0));
        assert!(!engine.tick(1000));
    }

    #[test]
    fn test_theater_chase_runs_on_tick() {
        let mut engine = engine(6);
        assert!(!engine.apply(Command::StartAnimation(Some(Animation::TheaterChase))));
        assert!(engine.tick(0));
        assert_eq!(engine.pixels()[0], DEFAULT_THEATER_CHASE_COLOR);
        assert_eq!(engine.pixels()[1], RGB8::default());
        assert_eq!(engine.pixels()[3], DEFAULT_THEATER_CHASE_COLOR);
        assert!(!engine.tick(10));
        assert!(engine.tick(50));
        assert_eq!(engine.pixels()[1], DEFAULT_THEATER_CHASE_COLOR);
    }

    #[test]
    fn test_custom_theater_chase_interval() {
        let mut engine = Engine::new(
            3,
            EngineTimings {
                theater_chase_interval_ms: 200,
                highlight_interval_ms: 50,
            },
        );
        engine.apply(Command::StartAnimation(Some(Animation::TheaterChase)));
        assert!(engine.tick(0));
        assert!(!engine.tick(150));
        assert!(engine.tick(200));
    }

    #[test]
    fn test_stop_animation_restores_zones() {
        let mut engine = engine(6);
        engine.apply(Command::StartAnimation(Some(Animation::Rainbow)));
        engine.tick(0);
        assert!(engine.apply(Command::StartAnimation(None)));
        assert!(engine.pixels().iter().all(|&p| p == DEFAULT_PLAYER_COLORS[0]));
        assert!(!engine.tick(100));
    }

    #[test]
    fn test_switching_animation_freezes_other_timers() {
        let mut engine = engine(6);
        engine.apply(Command::StartAnimation(Some(Animation::Rainbow)));
        engine.tick(0);
        engine.tick(20);
        let offset = engine.timers().rainbow.hue_offset;

        engine.apply(Command::StartAnimation(Some(Animation::Breathing)));
        for now in (40..400).step_by(10) {
            engine.tick(now);
        }
        assert_eq!(engine.timers().rainbow.hue_offset, offset);
        assert!(engine.timers().breathing.phase > 0.0);
    }

    #[test]
    fn test_highlight_fades_active_zone_only() {
        let mut engine = engine_with_players(10, 2);
        engine.apply(Command::SetActivePlayer(Some(1)));
        assert!(engine.tick(0));
        assert_eq!(engine.fader().level(), 19);
        assert_ne!(engine.pixels()[0], DEFAULT_PLAYER_COLORS[0]);
        assert_eq!(engine.pixels()[9], DEFAULT_PLAYER_COLORS[1]);
        assert!(!engine.tick(49));
        assert!(engine.tick(50));
    }

    #[test]
    fn test_fader_persists_across_highlights() {
        let mut engine = engine_with_players(10, 2);
        engine.apply(Command::SetActivePlayer(Some(1)));
        engine.tick(0);
        engine.tick(50);
        assert_eq!(engine.fader().level(), 18);

        engine.apply(Command::SetActivePlayer(None));
        engine.apply(Command::SetActivePlayer(Some(2)));
        engine.tick(100);
        assert_eq!(engine.fader().level(), 17);
    }

    #[test]
    fn test_animation_replaces_highlight() {
        let mut engine = engine_with_players(10, 3);
        engine.apply(Command::SetActivePlayer(Some(3)));
        engine.apply(Command::StartAnimation(Some(Animation::Breathing)));
        assert_eq!(engine.state().active_player(), None);
        engine.tick(0);
        let first = engine.pixels()[0];
        assert!(engine.pixels().iter().all(|&p| p == first));
    }

    #[test]
    fn test_reset_all() {
        let mut engine = engine_with_players(8, 2);
        engine.apply(Command::SetActivePlayer(Some(2)));
        assert!(engine.apply(Command::ResetAll));
        assert_eq!(engine.state().selection(), Selection::Idle);
        assert!(engine.pixels().iter().all(|&p| p == RESET_COLOR));
        assert!(!engine.tick(1000));

        // White stays until something repaints the zones
        engine.apply(Command::SetBrightness(10));
        assert!(engine.pixels().iter().all(|&p| p == RESET_COLOR));
        engine.apply(Command::AdjustPlayers(PlayerDelta::Increment));
        assert_eq!(engine.pixels()[0], DEFAULT_PLAYER_COLORS[0]);
    }

    #[test]
    fn test_snapshot() {
        let mut engine = engine_with_players(50, 3);
        engine.apply(Command::SetActivePlayer(Some(2)));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.led_count, 50);
        assert_eq!(snapshot.player_count, 3);
        assert_eq!(snapshot.player_colors.len(), 8);
        assert_eq!(snapshot.player_colors[0], "#FF0000");
        assert_eq!(snapshot.active_player, Some(2));
        assert_eq!(snapshot.active_zone, Some((17, 33)));
        assert_eq!(snapshot.animation, None);
        assert_eq!(snapshot.breathing_color, "#0000FF");
    }

    #[test]
    fn test_snapshot_json() {
        let mut engine = engine(10);
        engine.apply(Command::StartAnimation(Some(Animation::TheaterChase)));
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["animation"], "theater_chase");
        assert_eq!(json["active_player"], serde_json::Value::Null);
        assert_eq!(json["theater_chase_color"], "#FFFFFF");
    }
}
