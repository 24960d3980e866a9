//! Gallery endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{AddCommentRequest, GalleryEntry};
use crate::AppState;

/// GET /api/gallery - Finished rounds, newest first.
pub async fn list_gallery(State(state): State<AppState>) -> ApiResult<Vec<GalleryEntry>> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.gallery().await {
        Ok(entries) => success(entries, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/gallery/:id - A single entry.
pub async fn get_gallery_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<GalleryEntry> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.gallery_entry(&id).await {
        Ok(entry) => success(entry, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/gallery/:id/comments - Add or replace the caller's comment.
pub async fn add_gallery_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddCommentRequest>,
) -> ApiResult<GalleryEntry> {
    let revision_id = state.game.revision().await.unwrap_or(0);

    match state.game.add_comment(&id, request).await {
        Ok(entry) => {
            let new_revision = state.game.revision().await.unwrap_or(revision_id);
            success(entry, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
