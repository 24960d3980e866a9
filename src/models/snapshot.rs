//! Whole-game snapshot served to clients on load.

use serde::{Deserialize, Serialize};

use super::{Player, Round, RoundResult};

/// Everything a client needs to render the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub revision_id: i64,
    pub round: Round,
    /// Join order
    pub players: Vec<Player>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<RoundResult>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
}

/// Request body for resetting the game.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub clear_gallery: bool,
}
