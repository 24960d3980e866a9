//! Roster and score table.

use std::collections::BTreeMap;

use super::{keys, rules, Game};
use crate::errors::AppError;
use crate::models::Player;
use crate::store::StorePath;

impl Game {
    /// Add `name` to the roster. Joining twice with the same name is a no-op.
    pub async fn join(&self, name: &str) -> Result<Player, AppError> {
        let name = rules::normalize_name(name)?;

        let _command = self.commands.lock().await;

        let mut roster = self.roster().await?;
        if !roster.contains(&name) {
            roster.push(name.clone());
            self.save_key(keys::PLAYERS, &roster).await?;
            tracing::info!(player = %name, players = roster.len(), "Player joined");
        } else {
            tracing::debug!(player = %name, "Player rejoined");
        }

        let score_path = StorePath::key(keys::SCORES)?.child(&name)?;
        let score = match self.load::<u32>(&score_path).await? {
            Some(score) => score,
            None => {
                self.save(&score_path, &0u32).await?;
                0
            }
        };

        Ok(Player { name, score })
    }

    /// Joined player names in join order.
    pub async fn roster(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .load_key::<Vec<String>>(keys::PLAYERS)
            .await?
            .unwrap_or_default())
    }

    /// Players in join order with their scores.
    pub async fn players(&self) -> Result<Vec<Player>, AppError> {
        let scores = self.scores().await?;
        Ok(self
            .roster()
            .await?
            .into_iter()
            .map(|name| Player {
                score: scores.get(&name).copied().unwrap_or(0),
                name,
            })
            .collect())
    }

    /// Players ranked by score, ties broken by name.
    pub async fn scoreboard(&self) -> Result<Vec<Player>, AppError> {
        let mut players = self.players().await?;
        players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        Ok(players)
    }

    pub async fn scores(&self) -> Result<BTreeMap<String, u32>, AppError> {
        self.load_map(keys::SCORES).await
    }

    /// Read-then-write merge of round points into the score table.
    pub(super) async fn apply_score_deltas(
        &self,
        deltas: &BTreeMap<String, u32>,
    ) -> Result<(), AppError> {
        for (player, delta) in deltas {
            let path = StorePath::key(keys::SCORES)?.child(player)?;
            let current = self.load::<u32>(&path).await?.unwrap_or(0);
            self.save(&path, &(current + delta)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_game;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_distinct_joins_grow_roster() {
        let (game, _dir) = test_game().await;

        for name in ["amy", "bob", "cat"] {
            let player = game.join(name).await.unwrap();
            assert_eq!(player.score, 0);
        }

        assert_eq!(game.roster().await.unwrap(), ["amy", "bob", "cat"]);
        assert_eq!(game.scores().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejoin_keeps_roster_and_score() {
        let (game, _dir) = test_game().await;
        game.join("amy").await.unwrap();
        game.join("bob").await.unwrap();
        game.apply_score_deltas(&[("amy".to_string(), 2)].into())
            .await
            .unwrap();

        let again = game.join("  amy ").await.unwrap();

        assert_eq!(again.score, 2);
        assert_eq!(game.roster().await.unwrap(), ["amy", "bob"]);
    }

    #[tokio::test]
    async fn test_join_rejects_unusable_names() {
        let (game, _dir) = test_game().await;

        assert!(matches!(game.join("").await, Err(AppError::Validation(_))));
        assert!(matches!(game.join("a/b").await, Err(AppError::Validation(_))));
        assert!(game.roster().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoreboard_ranks_by_score_then_name() {
        let (game, _dir) = test_game().await;
        for name in ["dan", "amy", "bob"] {
            game.join(name).await.unwrap();
        }
        game.apply_score_deltas(&[("bob".to_string(), 3), ("dan".to_string(), 1)].into())
            .await
            .unwrap();

        let board: Vec<(String, u32)> = game
            .scoreboard()
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.name, p.score))
            .collect();
        assert_eq!(
            board,
            [
                ("bob".to_string(), 3),
                ("dan".to_string(), 1),
                ("amy".to_string(), 0)
            ]
        );

        // Join order is kept for the plain listing
        let names: Vec<String> = game
            .players()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["dan", "amy", "bob"]);
    }
}
