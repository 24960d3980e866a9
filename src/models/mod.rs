//! Data models for the game.
//!
//! Field names serialize in camelCase to match the browser client.

mod gallery;
mod player;
mod round;
mod snapshot;

pub use gallery::*;
pub use player::*;
pub use round::*;
pub use snapshot::*;
