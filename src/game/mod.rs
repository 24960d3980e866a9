//! Game orchestrator.
//!
//! The single authority over phase transitions. Commands are serialized
//! through one lock and applied to the shared store as a sequence of
//! per-key writes; there is no rollback, so reads tolerate partially
//! applied transitions (see [`RoundParts::assemble`]).

mod gallery;
pub mod keys;
pub mod rules;
mod session;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{
    AdvanceOutcome, AdvanceRequest, Ballot, CastVoteRequest, GalleryEntry, GameSnapshot, Phase,
    ResetRequest, Round, RoundParts, RoundResult, SubmitDrawingRequest, Submission, VoteOutcome,
};
use crate::store::{SharedStore, StorePath};

/// Runs the round state machine on top of a shared store.
pub struct Game {
    store: Arc<dyn SharedStore>,
    commands: Mutex<()>,
}

impl Game {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self {
            store,
            commands: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SharedStore> {
        &self.store
    }

    pub async fn revision(&self) -> Result<i64, AppError> {
        self.store.revision().await
    }

    // ==================== READS ====================

    /// The current round, assembled from its individual keys.
    pub async fn round(&self) -> Result<Round, AppError> {
        let parts = RoundParts {
            phase: self.load_key(keys::GAME_STATE).await?,
            round_number: self.load_key(keys::ROUND_NUMBER).await?,
            artist: self.load_key(keys::CURRENT_ARTIST).await?,
            drawing: self.load_key(keys::DRAWING).await?,
            category: self.load_key(keys::DRAWING_TYPE).await?,
            title: self.load_key(keys::DRAWING_TITLE).await?,
            votes: self.load_map(keys::VOTES).await?,
        };
        Ok(parts.assemble())
    }

    /// Everything a freshly loaded client needs.
    pub async fn snapshot(&self) -> Result<GameSnapshot, AppError> {
        // Read before the fields: the revision may understate the snapshot, never overstate it
        let revision_id = self.store.revision().await?;
        Ok(GameSnapshot {
            revision_id,
            round: self.round().await?,
            players: self.players().await?,
            last_result: self.load_key(keys::LAST_RESULT).await?,
        })
    }

    // ==================== TRANSITIONS ====================

    /// lobby -> drawing with a randomly chosen artist.
    pub async fn start(&self) -> Result<Round, AppError> {
        let _command = self.commands.lock().await;

        let round = self.round().await?;
        if round.phase() != Phase::Lobby {
            return Err(phase_guard("The game is already running", &round));
        }

        let players = self.roster().await?;
        if players.len() < rules::MIN_PLAYERS {
            return Err(phase_guard(
                format!(
                    "At least {} players are required to start the game",
                    rules::MIN_PLAYERS
                ),
                &round,
            ));
        }

        let artist = players
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| AppError::Internal("Roster emptied while starting".to_string()))?;
        let round_number = self.load_key::<u64>(keys::ROUND_NUMBER).await?.unwrap_or(0) + 1;

        self.clear_key(keys::LAST_RESULT).await?;
        let next = self.begin_drawing(round_number, artist).await?;

        tracing::info!(round_number, artist = next.artist(), "Game started");
        Ok(next)
    }

    /// drawing -> voting, accepted only from the current artist.
    pub async fn submit_drawing(&self, request: SubmitDrawingRequest) -> Result<Round, AppError> {
        let player = rules::normalize_name(&request.player)?;
        let title = rules::normalize_title(&request.title)?;
        rules::validate_drawing(&request.drawing)?;

        let _command = self.commands.lock().await;

        let round = self.round().await?;
        let Round::Drawing {
            round_number,
            artist,
        } = round
        else {
            return Err(phase_guard("Drawings are only accepted while drawing", &round));
        };
        if player != artist {
            tracing::debug!(%player, %artist, "Rejected drawing from non-artist");
            return Err(AppError::Guard {
                message: format!("Only the artist {} can submit the drawing", artist),
                phase: Some(Phase::Drawing.as_str()),
            });
        }

        let submission = Submission {
            drawing: request.drawing,
            category: request.category,
            title,
        };
        self.save_key(keys::DRAWING, &submission.drawing).await?;
        self.save_key(keys::DRAWING_TYPE, &submission.category).await?;
        self.save_key(keys::DRAWING_TITLE, &submission.title).await?;
        self.clear_key(keys::VOTES).await?;
        self.save_key(keys::GAME_STATE, &Phase::Voting).await?;

        tracing::info!(round_number, %artist, title = %submission.title, "Drawing submitted");
        Ok(Round::Voting {
            round_number,
            artist,
            submission,
            votes: BTreeMap::new(),
        })
    }

    /// Record one ballot; finishes the round when it was the last one missing.
    pub async fn cast_vote(&self, request: CastVoteRequest) -> Result<VoteOutcome, AppError> {
        let player = rules::normalize_name(&request.player)?;
        let comment = rules::normalize_comment(request.comment.as_deref())?;

        let _command = self.commands.lock().await;

        let round = self.round().await?;
        let Round::Voting { artist, votes, .. } = &round else {
            return Err(phase_guard("Votes are only accepted while voting", &round));
        };
        if player == *artist {
            return Err(phase_guard("The artist cannot vote", &round));
        }
        if votes.contains_key(&player) {
            return Err(phase_guard(format!("{} has already voted", player), &round));
        }
        if !self.roster().await?.contains(&player) {
            return Err(phase_guard(format!("{} has not joined the game", player), &round));
        }

        let ballot = Ballot {
            category: request.category,
            comment,
        };
        self.save(&StorePath::key(keys::VOTES)?.child(&player)?, &ballot)
            .await?;
        tracing::info!(%player, category = ?ballot.category, "Vote cast");

        // Completion is judged on a fresh read, never on the pre-vote view
        let round = self.round().await?;
        let players = self.roster().await?;
        match round {
            Round::Voting {
                round_number,
                artist,
                submission,
                votes,
            } if rules::voting_complete(&players, &artist, &votes) => {
                let (result, round) = self
                    .finish_round(round_number, artist, submission, votes)
                    .await?;
                Ok(VoteOutcome {
                    round,
                    result: Some(result),
                })
            }
            round => Ok(VoteOutcome {
                round,
                result: None,
            }),
        }
    }

    /// voting -> drawing on the artist's request.
    ///
    /// A request for a round that already finished is a no-op.
    pub async fn advance(&self, request: AdvanceRequest) -> Result<AdvanceOutcome, AppError> {
        let player = rules::normalize_name(&request.player)?;

        let _command = self.commands.lock().await;

        let round = self.round().await?;
        if round.round_number() != request.expected_round {
            tracing::debug!(
                expected = request.expected_round,
                current = round.round_number(),
                "Ignoring stale advance"
            );
            return Ok(AdvanceOutcome::Stale { round });
        }

        let Round::Voting {
            round_number,
            artist,
            submission,
            votes,
        } = round
        else {
            return Err(phase_guard("Only a voting round can be advanced", &round));
        };
        if player != artist {
            return Err(AppError::Guard {
                message: format!("Only the artist {} can advance the round", artist),
                phase: Some(Phase::Voting.as_str()),
            });
        }

        let (result, round) = self
            .finish_round(round_number, artist, submission, votes)
            .await?;
        Ok(AdvanceOutcome::Advanced { result, round })
    }

    /// Back to an empty lobby. The gallery is kept unless asked otherwise.
    pub async fn reset(&self, request: ResetRequest) -> Result<(), AppError> {
        let _command = self.commands.lock().await;

        for key in [
            keys::PLAYERS,
            keys::SCORES,
            keys::CURRENT_ARTIST,
            keys::ROUND_NUMBER,
            keys::LAST_RESULT,
        ]
        .into_iter()
        .chain(keys::ROUND_SCRATCH)
        {
            self.clear_key(key).await?;
        }
        if request.clear_gallery {
            self.clear_key(keys::GALLERY).await?;
        }
        self.save_key(keys::GAME_STATE, &Phase::Lobby).await?;

        tracing::info!(clear_gallery = request.clear_gallery, "Game reset");
        Ok(())
    }

    /// Score, archive and rotate. Callers hold the command lock.
    ///
    /// Steps run in order: scores, gallery, result overlay, round reset.
    async fn finish_round(
        &self,
        round_number: u64,
        artist: String,
        submission: Submission,
        votes: BTreeMap<String, Ballot>,
    ) -> Result<(RoundResult, Round), AppError> {
        let tally = rules::tally(&votes, submission.category);
        let deltas = rules::score_deltas(&tally, &artist);
        self.apply_score_deltas(&deltas).await?;

        let finished_at = Utc::now().to_rfc3339();
        let gallery_id = self
            .commit_to_gallery(&GalleryEntry {
                id: String::new(),
                drawing: submission.drawing,
                category: submission.category,
                title: submission.title.clone(),
                artist: artist.clone(),
                round_number,
                created_at: finished_at.clone(),
                votes,
                comments: BTreeMap::new(),
            })
            .await?;

        let players = self.roster().await?;
        let next_artist = rules::next_artist(&players, &artist)
            .unwrap_or(artist.as_str())
            .to_string();

        let result = RoundResult {
            round_number,
            artist,
            category: submission.category,
            title: submission.title,
            gallery_id,
            consensus: tally.consensus(),
            tally,
            score_deltas: deltas,
            finished_at,
        };
        self.save_key(keys::LAST_RESULT, &result).await?;

        let next = self.begin_drawing(round_number + 1, next_artist).await?;

        tracing::info!(
            round_number,
            correct = result.tally.correct,
            total = result.tally.total(),
            next_artist = next.artist(),
            "Round finished"
        );
        Ok((result, next))
    }

    /// Clear the per-round keys and hand the canvas to `artist`. Phase is written last.
    async fn begin_drawing(&self, round_number: u64, artist: String) -> Result<Round, AppError> {
        for key in keys::ROUND_SCRATCH {
            self.clear_key(key).await?;
        }
        self.save_key(keys::CURRENT_ARTIST, &artist).await?;
        self.save_key(keys::ROUND_NUMBER, &round_number).await?;
        self.save_key(keys::GAME_STATE, &Phase::Drawing).await?;

        Ok(Round::Drawing {
            round_number,
            artist,
        })
    }

    // ==================== STORE HELPERS ====================

    /// Typed read. Malformed values are logged and read as absent.
    async fn load<T: DeserializeOwned>(&self, path: &StorePath) -> Result<Option<T>, AppError> {
        let Some(value) = self.store.read(path).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Ignoring malformed stored value");
                Ok(None)
            }
        }
    }

    async fn load_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        self.load(&StorePath::key(key)?).await
    }

    /// Typed read of a keyed collection, skipping malformed children.
    async fn load_map<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<BTreeMap<String, T>, AppError> {
        let Some(Value::Object(children)) = self.store.read(&StorePath::key(key)?).await? else {
            return Ok(BTreeMap::new());
        };

        Ok(children
            .into_iter()
            .filter_map(|(child, value)| match serde_json::from_value(value) {
                Ok(value) => Some((child, value)),
                Err(e) => {
                    tracing::warn!(key, %child, error = %e, "Ignoring malformed stored child");
                    None
                }
            })
            .collect())
    }

    async fn save<T: Serialize>(&self, path: &StorePath, value: &T) -> Result<(), AppError> {
        self.store.write(path, serde_json::to_value(value)?).await
    }

    async fn save_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        self.save(&StorePath::key(key)?, value).await
    }

    async fn clear_key(&self, key: &str) -> Result<(), AppError> {
        self.store.write(&StorePath::key(key)?, Value::Null).await
    }
}

fn phase_guard(message: impl Into<String>, round: &Round) -> AppError {
    AppError::Guard {
        message: message.into(),
        phase: Some(round.phase().as_str()),
    }
}

#[cfg(test)]
async fn test_game() -> (Game, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let pool = crate::db::init_database(&temp_dir.path().join("game.sqlite"))
        .await
        .unwrap();
    let store = Arc::new(crate::db::SqliteStore::new(pool, 64));
    (Game::new(store), temp_dir)
}
