//! Commands accepted by the engine
//!
//! The web handlers and the preview tool never touch the render state
//! directly; they build a [`Command`] and hand it to whoever owns the
//! [`Engine`](crate::Engine).

use crate::animation::Animation;
use crate::RGB8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerDelta {
    Increment,
    Decrement,
}

/// New colors for the animations; `None` keeps the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationColorUpdate {
    pub theater_chase: Option<RGB8>,
    pub breathing: Option<RGB8>,
}

impl AnimationColorUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.theater_chase.is_none() && self.breathing.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AdjustPlayers(PlayerDelta),
    SetBrightness(u8),
    /// `None` (or a player that is not seated) clears the highlight
    SetActivePlayer(Option<u8>),
    /// Zero-based player slot and its new color
    SetPlayerColors(Vec<(usize, RGB8)>),
    SetAnimationColors(AnimationColorUpdate),
    /// `None` stops the running animation
    StartAnimation(Option<Animation>),
    ResetAll,
}
