//! Keyboard and mouse state mapped to viewer actions.
//!
//! # Invariants
//! - Only camera movement and quit are consumed; everything else is ignored.
//! - Quit latches: once requested it stays requested until the app exits.

pub mod action;
mod state;

pub use action::Action;
pub use state::{BOOST_FACTOR, InputState};
