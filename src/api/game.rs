//! Whole-game endpoints: snapshot, start and reset.

use axum::{body::Bytes, extract::State};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{GameSnapshot, ResetRequest, RevisionInfo, Round};
use crate::AppState;

/// GET /api/game - Full game snapshot.
pub async fn get_game(State(state): State<AppState>) -> ApiResult<GameSnapshot> {
    match state.game.snapshot().await {
        Ok(snapshot) => {
            let revision_id = snapshot.revision_id;
            success(snapshot, revision_id)
        }
        Err(e) => error(e, 0),
    }
}

/// GET /api/game/revision - Current store revision.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    match state.game.revision().await {
        Ok(revision_id) => success(RevisionInfo { revision_id }, revision_id),
        Err(e) => error(e, 0),
    }
}

/// POST /api/game/start - Leave the lobby and pick the first artist.
pub async fn start_game(State(state): State<AppState>) -> ApiResult<Round> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.start().await {
        Ok(round) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(round, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/game/reset - Clear players, scores and the round.
///
/// The body is optional; an empty one keeps the gallery.
pub async fn reset_game(State(state): State<AppState>, body: Bytes) -> ApiResult<()> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    let request = if body.is_empty() {
        ResetRequest::default()
    } else {
        match serde_json::from_slice::<ResetRequest>(&body) {
            Ok(request) => request,
            Err(e) => return error(AppError::malformed_body(e), revision_id),
        }
    };

    match state.game.reset(request).await {
        Ok(()) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
