//! Top-level store keys used by the game.

pub const GAME_STATE: &str = "gameState";
pub const PLAYERS: &str = "players";
pub const CURRENT_ARTIST: &str = "currentArtist";
pub const DRAWING: &str = "drawing";
pub const DRAWING_TYPE: &str = "drawingType";
pub const DRAWING_TITLE: &str = "drawingTitle";
pub const VOTES: &str = "votes";
pub const SCORES: &str = "scores";
pub const GALLERY: &str = "gallery";
pub const ROUND_NUMBER: &str = "roundNumber";
pub const LAST_RESULT: &str = "lastResult";

/// Per-round keys cleared between rounds.
pub const ROUND_SCRATCH: [&str; 4] = [DRAWING, DRAWING_TYPE, DRAWING_TITLE, VOTES];
