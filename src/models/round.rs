//! Round state, ballots and tally results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Stored position of the round in the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    Drawing,
    Voting,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::Drawing => "drawing",
            Phase::Voting => "voting",
        }
    }
}

/// What a drawing depicts. Voters guess one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Poop,
    Cloud,
}

/// One player's guess, with an optional remark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// The artist's finished drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Opaque `data:image/...` URL
    pub drawing: String,
    pub category: Category,
    pub title: String,
}

/// The current round. Each phase only carries the data valid in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Round {
    Lobby,
    Drawing {
        round_number: u64,
        artist: String,
    },
    Voting {
        round_number: u64,
        artist: String,
        submission: Submission,
        votes: BTreeMap<String, Ballot>,
    },
}

impl Round {
    pub fn phase(&self) -> Phase {
        match self {
            Round::Lobby => Phase::Lobby,
            Round::Drawing { .. } => Phase::Drawing,
            Round::Voting { .. } => Phase::Voting,
        }
    }

    pub fn artist(&self) -> Option<&str> {
        match self {
            Round::Lobby => None,
            Round::Drawing { artist, .. } | Round::Voting { artist, .. } => Some(artist),
        }
    }

    /// Zero while in the lobby.
    pub fn round_number(&self) -> u64 {
        match self {
            Round::Lobby => 0,
            Round::Drawing { round_number, .. } | Round::Voting { round_number, .. } => {
                *round_number
            }
        }
    }
}

/// Flat round fields as read from the store, any of which may be missing.
#[derive(Debug, Clone, Default)]
pub struct RoundParts {
    pub phase: Option<Phase>,
    pub round_number: Option<u64>,
    pub artist: Option<String>,
    pub drawing: Option<String>,
    pub category: Option<Category>,
    pub title: Option<String>,
    pub votes: BTreeMap<String, Ballot>,
}

impl RoundParts {
    /// Build the typed round, downgrading phases whose data is incomplete.
    ///
    /// Voting without a full submission reads as drawing, and any phase
    /// without an artist reads as lobby.
    pub fn assemble(self) -> Round {
        let phase = self.phase.unwrap_or_default();
        let round_number = self.round_number.unwrap_or(0);

        let Some(artist) = self.artist.filter(|_| phase != Phase::Lobby) else {
            return Round::Lobby;
        };

        match (phase, self.drawing, self.category, self.title) {
            (Phase::Voting, Some(drawing), Some(category), Some(title)) => Round::Voting {
                round_number,
                artist,
                submission: Submission {
                    drawing,
                    category,
                    title,
                },
                votes: self.votes,
            },
            _ => Round::Drawing {
                round_number,
                artist,
            },
        }
    }
}

/// Vote counts for a finished round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub poop: u32,
    pub cloud: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// Pruned by the store when empty
    #[serde(default)]
    pub correct_voters: BTreeSet<String>,
}

impl Tally {
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Category with strictly more votes; ties fall back to cloud.
    pub fn consensus(&self) -> Category {
        if self.poop > self.cloud {
            Category::Poop
        } else {
            Category::Cloud
        }
    }
}

/// Summary of the most recently finished round, shown as a results overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round_number: u64,
    pub artist: String,
    pub category: Category,
    pub title: String,
    pub gallery_id: String,
    pub tally: Tally,
    pub consensus: Category,
    #[serde(default)]
    pub score_deltas: BTreeMap<String, u32>,
    pub finished_at: String,
}

/// Request body for submitting the round's drawing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDrawingRequest {
    pub player: String,
    pub drawing: String,
    pub category: Category,
    pub title: String,
}

/// Request body for casting a vote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub player: String,
    pub category: Category,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request body for forcing the voting round to finish.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub player: String,
    pub expected_round: u64,
}

/// Result of an accepted vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub round: Round,
    /// Set when this vote completed the round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RoundResult>,
}

/// Result of an advance request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AdvanceOutcome {
    Advanced { result: RoundResult, round: Round },
    /// The expected round already finished; nothing changed
    Stale { round: Round },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn voting_parts() -> RoundParts {
        RoundParts {
            phase: Some(Phase::Voting),
            round_number: Some(3),
            artist: Some("amy".to_string()),
            drawing: Some("data:image/png;base64,AAAA".to_string()),
            category: Some(Category::Poop),
            title: Some("Sunset".to_string()),
            votes: BTreeMap::from([(
                "bob".to_string(),
                Ballot {
                    category: Category::Cloud,
                    comment: None,
                },
            )]),
        }
    }

    #[test]
    fn test_assemble_complete_voting_round() {
        let round = voting_parts().assemble();
        assert_eq!(round.phase(), Phase::Voting);
        assert_eq!(round.artist(), Some("amy"));
        assert_eq!(round.round_number(), 3);
    }

    #[test]
    fn test_voting_without_drawing_reads_as_drawing() {
        let parts = RoundParts {
            drawing: None,
            ..voting_parts()
        };
        assert_eq!(
            parts.assemble(),
            Round::Drawing {
                round_number: 3,
                artist: "amy".to_string()
            }
        );
    }

    #[test]
    fn test_missing_artist_reads_as_lobby() {
        let parts = RoundParts {
            artist: None,
            ..voting_parts()
        };
        assert_eq!(parts.assemble(), Round::Lobby);
        assert_eq!(RoundParts::default().assemble(), Round::Lobby);
    }

    #[test]
    fn test_round_wire_shape() {
        let value = serde_json::to_value(voting_parts().assemble()).unwrap();
        assert_eq!(value["phase"], "voting");
        assert_eq!(value["roundNumber"], 3);
        assert_eq!(value["submission"]["category"], "poop");
        assert_eq!(value["votes"]["bob"], json!({ "category": "cloud" }));
    }

    #[test]
    fn test_result_reads_back_without_empty_collections() {
        // The store prunes empty sets and maps on write
        let stored = json!({
            "roundNumber": 2,
            "artist": "amy",
            "category": "poop",
            "title": "Swirl",
            "galleryId": "0000000000011234abcd",
            "tally": { "poop": 0, "cloud": 1, "correct": 0, "incorrect": 1 },
            "consensus": "cloud",
            "finishedAt": "2026-01-01T00:00:00Z"
        });

        let result: RoundResult = serde_json::from_value(stored).unwrap();
        assert!(result.tally.correct_voters.is_empty());
        assert!(result.score_deltas.is_empty());
        assert_eq!(result.tally.incorrect, 1);
    }

    #[test]
    fn test_consensus_tie_falls_back_to_cloud() {
        let tally = Tally {
            poop: 2,
            cloud: 2,
            ..Tally::default()
        };
        assert_eq!(tally.consensus(), Category::Cloud);

        let tally = Tally {
            poop: 3,
            cloud: 2,
            ..Tally::default()
        };
        assert_eq!(tally.consensus(), Category::Poop);
    }
}
