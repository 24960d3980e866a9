//! Roster and scoreboard endpoints.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::models::{JoinRequest, Player};
use crate::AppState;

/// GET /api/players - Players in join order.
pub async fn list_players(State(state): State<AppState>) -> ApiResult<Vec<Player>> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.players().await {
        Ok(players) => success(players, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/players - Join the game (idempotent per name).
pub async fn join_game(
    State(state): State<AppState>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<Player> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.join(&request.name).await {
        Ok(player) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(player, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/scores - Players ranked by score.
pub async fn get_scoreboard(State(state): State<AppState>) -> ApiResult<Vec<Player>> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.scoreboard().await {
        Ok(players) => success(players, revision_id),
        Err(e) => error(e, revision_id),
    }
}
