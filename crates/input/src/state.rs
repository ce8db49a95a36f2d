use crate::action::Action;
use glam::{Vec2, Vec3};
use std::collections::BTreeSet;

/// Speed multiplier while [`Action::Boost`] is held.
pub const BOOST_FACTOR: f32 = 3.0;

/// Held actions and accumulated mouse motion between two frames.
#[derive(Debug, Default)]
pub struct InputState {
    held: BTreeSet<Action>,
    mouse_delta: Vec2,
    quit_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, action: Action) {
        if action == Action::Quit {
            if !self.quit_requested {
                tracing::info!("quit requested");
            }
            self.quit_requested = true;
            return;
        }
        self.held.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    /// Returns the motion accumulated since the last call.
    pub fn take_mouse_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.mouse_delta)
    }

    /// Combined (right, up, forward) direction of the held movement actions,
    /// normalized so diagonals are not faster.
    pub fn movement(&self) -> Vec3 {
        let sum = self
            .held
            .iter()
            .fold(Vec3::ZERO, |acc, a| acc + Vec3::from_array(a.axis()));
        sum.normalize_or_zero()
    }

    pub fn speed_factor(&self) -> f32 {
        if self.is_held(Action::Boost) {
            BOOST_FACTOR
        } else {
            1.0
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn clear_held(&mut self) {
        self.held.clear();
    }
}
