//! Shared state store abstraction.
//!
//! A keyed, subscribable JSON tree. Every game entity lives here; the
//! orchestrator is the only writer, HTTP clients read and subscribe.

mod path;
pub mod tree;

pub use path::*;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::errors::AppError;

/// A committed write, carrying the full new document of the touched top-level key.
#[derive(Debug, Clone)]
pub struct Change {
    pub root: String,
    pub document: Option<Arc<Value>>,
    pub revision: i64,
}

/// The store contract the orchestrator relies on.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Point-in-time value at `path`.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError>;

    /// Live view of `path`: current value first, then every change.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, AppError>;

    /// Replace the value at `path` wholesale. `Value::Null` deletes it.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError>;

    /// Store `value` under a freshly generated child key of `path`.
    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError>;

    /// Monotonic counter bumped by every write.
    async fn revision(&self) -> Result<i64, AppError>;
}

/// Stream of values observed at one path.
pub struct Subscription {
    path: StorePath,
    changes: broadcast::Receiver<Change>,
    pending: Option<Option<Value>>,
    last: Option<Option<Value>>,
}

impl Subscription {
    /// `changes` must be subscribed before `initial` is read so no write is missed.
    pub fn new(path: StorePath, changes: broadcast::Receiver<Change>, initial: Option<Value>) -> Self {
        Self {
            path,
            changes,
            pending: Some(initial),
            last: None,
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Next distinct value at the path, `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if let Some(initial) = self.pending.take() {
            self.last = Some(initial.clone());
            return Some(initial);
        }

        loop {
            match self.changes.recv().await {
                Ok(change) => {
                    if change.root != self.path.root() {
                        continue;
                    }
                    let value = change
                        .document
                        .as_deref()
                        .and_then(|doc| tree::get_in(doc, self.path.rest()))
                        .cloned();
                    if self.last.as_ref() == Some(&value) {
                        continue;
                    }
                    tracing::trace!(path = %self.path, revision = change.revision, "Subscription update");
                    self.last = Some(value.clone());
                    return Some(value);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(path = %self.path, skipped, "Subscriber lagged behind store changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
