//! Gallery entries: finished rounds kept for later browsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Ballot, Category};

/// A finished round. Only `comments` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    /// Store-assigned key; not part of the stored record
    #[serde(default, skip_deserializing, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub drawing: String,
    pub category: Category,
    pub title: String,
    pub artist: String,
    pub round_number: u64,
    pub created_at: String,
    #[serde(default)]
    pub votes: BTreeMap<String, Ballot>,
    #[serde(default)]
    pub comments: BTreeMap<String, GalleryComment>,
}

/// A remark left on a gallery entry, one per player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryComment {
    pub text: String,
    pub posted_at: String,
}

/// Request body for commenting on a gallery entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub player: String,
    pub text: String,
}
