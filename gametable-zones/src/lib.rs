//! Zone and animation engine for the game table light strip
//!
//! This library owns everything that decides what the LED strip shows: the
//! per-player zone partition, the render state mutated by the web interface,
//! the three timed animations and the active-player highlight. It is
//! hardware-agnostic and can be tested without embedded hardware; the firmware
//! only flushes [`Engine::pixels`] to the strip.

pub use rgb::RGB8;

pub mod animation;
pub mod board;
pub mod command;
pub mod credentials;
pub mod engine;
pub mod form;
pub mod highlight;
pub mod ip_show;
pub mod state;
pub mod zones;

pub use animation::{Animation, AnimationTimers};
pub use board::{is_led_gpio, MAX_LED_COUNT};
pub use command::{AnimationColorUpdate, Command, PlayerDelta};
pub use credentials::{
    truncate_ssid, CredentialError, CredentialImage, SlotSummary, WifiCredentials,
};
pub use engine::{Engine, EngineTimings, StateSnapshot};
pub use form::{ColorParseError, FormError, Params, Route, RouteMethod, WifiForm};
pub use highlight::{FadeDirection, HighlightFader};
pub use ip_show::{ip_show_steps, ShowStep};
pub use state::{RenderState, Selection};
pub use zones::{paint_zones, partition, Zone};

/// Number of player slots around the table
pub const MAX_PLAYERS: usize = 8;
