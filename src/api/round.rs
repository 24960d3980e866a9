//! Current round endpoints: drawing, voting and advancing.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::models::{
    AdvanceOutcome, AdvanceRequest, CastVoteRequest, Round, SubmitDrawingRequest, VoteOutcome,
};
use crate::AppState;

/// GET /api/round - The current round.
pub async fn get_round(State(state): State<AppState>) -> ApiResult<Round> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.round().await {
        Ok(round) => success(round, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/round/drawing - The artist hands in the drawing.
pub async fn submit_drawing(
    State(state): State<AppState>,
    Json(request): Json<SubmitDrawingRequest>,
) -> ApiResult<Round> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.submit_drawing(request).await {
        Ok(round) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(round, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/round/votes - Cast a ballot.
pub async fn cast_vote(
    State(state): State<AppState>,
    Json(request): Json<CastVoteRequest>,
) -> ApiResult<VoteOutcome> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.cast_vote(request).await {
        Ok(outcome) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(outcome, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/round/advance - The artist closes voting early.
pub async fn advance_round(
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> ApiResult<AdvanceOutcome> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.advance(request).await {
        Ok(outcome) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(outcome, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
