//! Read-only access to the shared state store.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde_json::Value;

use super::{error, success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::store::StorePath;
use crate::AppState;

/// GET /api/store/*key - Point-in-time value, `null` when absent.
pub async fn read_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Option<Value>> {
    let store = state.game.store();
    let revision_id = store.revision().await.unwrap_or(0);

    let path = match StorePath::parse(&key) {
        Ok(path) => path,
        Err(e) => return error(e, revision_id),
    };

    match store.read(&path).await {
        Ok(value) => success(value, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/subscribe/*key - Server-sent events, one JSON value per change.
///
/// The first event carries the current value.
pub async fn subscribe_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppErrorWithRevision> {
    let subscription = match StorePath::parse(&key) {
        Ok(path) => state.game.store().subscribe(&path).await,
        Err(e) => Err(e),
    }
    .map_err(|error| AppErrorWithRevision {
        error,
        revision_id: 0,
    })?;

    tracing::debug!(path = %subscription.path(), "Client subscribed");

    let events = futures::stream::unfold(subscription, |mut subscription| async move {
        let value = subscription.next().await?;
        Some((Event::default().json_data(value), subscription))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
