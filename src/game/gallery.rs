//! Append-only gallery of finished rounds.

use chrono::Utc;

use super::{keys, rules, Game};
use crate::errors::AppError;
use crate::models::{AddCommentRequest, GalleryComment, GalleryEntry};
use crate::store::{validate_segment, StorePath};

impl Game {
    /// Append a finished round and return its store-assigned id.
    pub(super) async fn commit_to_gallery(&self, entry: &GalleryEntry) -> Result<String, AppError> {
        let id = self
            .store
            .append(&StorePath::key(keys::GALLERY)?, serde_json::to_value(entry)?)
            .await?;
        tracing::info!(gallery_id = %id, artist = %entry.artist, "Round archived to gallery");
        Ok(id)
    }

    /// All entries, newest first.
    pub async fn gallery(&self) -> Result<Vec<GalleryEntry>, AppError> {
        let mut entries: Vec<GalleryEntry> = self
            .load_map::<GalleryEntry>(keys::GALLERY)
            .await?
            .into_iter()
            .map(|(id, entry)| GalleryEntry { id, ..entry })
            .collect();

        // Ids are time-ordered
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(entries)
    }

    pub async fn gallery_entry(&self, id: &str) -> Result<GalleryEntry, AppError> {
        validate_segment(id).map_err(|_| AppError::NotFound(format!("Gallery entry {} not found", id)))?;

        self.load::<GalleryEntry>(&StorePath::key(keys::GALLERY)?.child(id)?)
            .await?
            .map(|entry| GalleryEntry {
                id: id.to_string(),
                ..entry
            })
            .ok_or_else(|| AppError::NotFound(format!("Gallery entry {} not found", id)))
    }

    /// Set `player`'s comment on an entry, replacing any earlier one.
    ///
    /// Only `comments/{player}` is written; the rest of the entry is untouched.
    pub async fn add_comment(
        &self,
        id: &str,
        request: AddCommentRequest,
    ) -> Result<GalleryEntry, AppError> {
        let player = rules::normalize_name(&request.player)?;
        let text = rules::normalize_comment(Some(request.text.as_str()))?
            .ok_or_else(|| AppError::Validation("Comment text is required".to_string()))?;

        let _command = self.commands.lock().await;

        // Existence check first so unknown ids report NOT_FOUND
        self.gallery_entry(id).await?;
        if !self.roster().await?.contains(&player) {
            return Err(AppError::guard(format!("{} has not joined the game", player)));
        }

        let path = StorePath::key(keys::GALLERY)?
            .child(id)?
            .child("comments")?
            .child(&player)?;
        let comment = GalleryComment {
            text,
            posted_at: Utc::now().to_rfc3339(),
        };
        self.save(&path, &comment).await?;
        tracing::info!(gallery_id = %id, %player, "Gallery comment saved");

        self.gallery_entry(id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::test_game;
    use crate::errors::AppError;
    use crate::models::{AddCommentRequest, Ballot, Category, GalleryEntry};

    fn entry(title: &str, round_number: u64) -> GalleryEntry {
        GalleryEntry {
            id: String::new(),
            drawing: "data:image/png;base64,AAAA".to_string(),
            category: Category::Cloud,
            title: title.to_string(),
            artist: "amy".to_string(),
            round_number,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            votes: BTreeMap::from([(
                "bob".to_string(),
                Ballot {
                    category: Category::Poop,
                    comment: Some("stinky".to_string()),
                },
            )]),
            comments: BTreeMap::new(),
        }
    }

    fn comment(player: &str, text: &str) -> AddCommentRequest {
        AddCommentRequest {
            player: player.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_gallery_lists_newest_first() {
        let (game, _dir) = test_game().await;
        let first = game.commit_to_gallery(&entry("First", 1)).await.unwrap();
        let second = game.commit_to_gallery(&entry("Second", 2)).await.unwrap();

        let gallery = game.gallery().await.unwrap();
        let ids: Vec<&str> = gallery.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, [second.as_str(), first.as_str()]);
        assert_eq!(gallery[1].title, "First");
        assert_eq!(gallery[1].votes["bob"].comment.as_deref(), Some("stinky"));
    }

    #[tokio::test]
    async fn test_comment_touches_only_its_slot() {
        let (game, _dir) = test_game().await;
        game.join("bob").await.unwrap();
        game.join("cat").await.unwrap();
        let target = game.commit_to_gallery(&entry("Target", 1)).await.unwrap();
        let other = game.commit_to_gallery(&entry("Other", 2)).await.unwrap();
        let other_before = game.gallery_entry(&other).await.unwrap();

        game.add_comment(&target, comment("cat", "so fluffy"))
            .await
            .unwrap();
        let before = game.gallery_entry(&target).await.unwrap();

        let after = game
            .add_comment(&target, comment("bob", "first!"))
            .await
            .unwrap();
        let after = game
            .add_comment(&after.id, comment("bob", "changed my mind"))
            .await
            .unwrap();

        assert_eq!(after.comments.len(), 2);
        assert_eq!(after.comments["bob"].text, "changed my mind");
        assert_eq!(after.comments["cat"], before.comments["cat"]);
        assert_eq!(
            GalleryEntry {
                comments: before.comments.clone(),
                ..after.clone()
            },
            before
        );
        assert_eq!(game.gallery_entry(&other).await.unwrap(), other_before);
    }

    #[tokio::test]
    async fn test_comment_guards() {
        let (game, _dir) = test_game().await;
        game.join("bob").await.unwrap();
        let id = game.commit_to_gallery(&entry("Target", 1)).await.unwrap();

        assert!(matches!(
            game.add_comment(&id, comment("stranger", "hi")).await,
            Err(AppError::Guard { .. })
        ));
        assert!(matches!(
            game.add_comment("missing", comment("bob", "hi")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            game.add_comment(&id, comment("bob", "   ")).await,
            Err(AppError::Validation(_))
        ));
        assert!(game.gallery_entry(&id).await.unwrap().comments.is_empty());
    }
}
