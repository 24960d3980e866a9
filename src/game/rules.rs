//! Pure game rules: tallying, scoring, artist rotation and input checks.

use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::models::{Ballot, Category, Tally};
use crate::store::validate_segment;

/// Players needed before a game can start.
pub const MIN_PLAYERS: usize = 2;
pub const MAX_NAME_CHARS: usize = 32;
pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_COMMENT_CHARS: usize = 280;

/// Count ballots against the declared category.
pub fn tally(votes: &BTreeMap<String, Ballot>, declared: Category) -> Tally {
    votes.iter().fold(Tally::default(), |mut tally, (voter, ballot)| {
        match ballot.category {
            Category::Poop => tally.poop += 1,
            Category::Cloud => tally.cloud += 1,
        }
        if ballot.category == declared {
            tally.correct += 1;
            tally.correct_voters.insert(voter.clone());
        } else {
            tally.incorrect += 1;
        }
        tally
    })
}

/// Points earned this round.
///
/// Each correct voter gets one point. The artist gets one point when a
/// strict majority of ballots guessed right.
pub fn score_deltas(tally: &Tally, artist: &str) -> BTreeMap<String, u32> {
    let mut deltas: BTreeMap<String, u32> = tally
        .correct_voters
        .iter()
        .map(|voter| (voter.clone(), 1))
        .collect();

    if tally.correct * 2 > tally.total() {
        *deltas.entry(artist.to_string()).or_insert(0) += 1;
    }

    deltas
}

/// The player after `current` in join order, wrapping around.
///
/// Falls back to the first player when `current` has left the roster.
pub fn next_artist<'a>(players: &'a [String], current: &str) -> Option<&'a str> {
    let next = match players.iter().position(|p| p == current) {
        Some(i) => players.get((i + 1) % players.len()),
        None => players.first(),
    };
    next.map(String::as_str)
}

/// Whether every joined player other than the artist has voted.
pub fn voting_complete(players: &[String], artist: &str, votes: &BTreeMap<String, Ballot>) -> bool {
    let mut voters = players.iter().filter(|p| p.as_str() != artist).peekable();
    voters.peek().is_some() && voters.all(|p| votes.contains_key(p))
}

/// Trimmed display name, usable as a store key.
pub fn normalize_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "Name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    validate_segment(name).map_err(|_| {
        AppError::Validation("Name may not contain . # $ [ ] / or control characters".to_string())
    })?;
    Ok(name.to_string())
}

pub fn normalize_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

/// Trimmed comment; blank comments become `None`.
pub fn normalize_comment(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(comment) = raw.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(Some(comment.to_string()))
}

/// The drawing is opaque, but it has to look like an image data URL.
pub fn validate_drawing(drawing: &str) -> Result<(), AppError> {
    if !drawing.starts_with("data:image/") || !drawing.contains(',') {
        return Err(AppError::Validation(
            "Drawing must be an image data URL".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballots(votes: &[(&str, Category)]) -> BTreeMap<String, Ballot> {
        votes
            .iter()
            .map(|(name, category)| {
                (
                    name.to_string(),
                    Ballot {
                        category: *category,
                        comment: None,
                    },
                )
            })
            .collect()
    }

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_tally_and_majority_bonus() {
        let votes = ballots(&[
            ("p1", Category::Poop),
            ("p2", Category::Poop),
            ("p3", Category::Cloud),
        ]);
        let tally = tally(&votes, Category::Poop);

        assert_eq!((tally.poop, tally.cloud), (2, 1));
        assert_eq!((tally.correct, tally.incorrect), (2, 1));

        let deltas = score_deltas(&tally, "artist");
        assert_eq!(
            deltas,
            BTreeMap::from([
                ("artist".to_string(), 1),
                ("p1".to_string(), 1),
                ("p2".to_string(), 1),
            ])
        );
    }

    #[test]
    fn test_no_bonus_on_even_split() {
        let votes = ballots(&[("p1", Category::Cloud), ("p2", Category::Poop)]);
        let deltas = score_deltas(&tally(&votes, Category::Cloud), "artist");
        assert_eq!(deltas, BTreeMap::from([("p1".to_string(), 1)]));
    }

    #[test]
    fn test_no_votes_scores_nothing() {
        let deltas = score_deltas(&tally(&BTreeMap::new(), Category::Cloud), "artist");
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_next_artist_cycles_join_order() {
        let players = roster(&["amy", "bob", "cat"]);
        assert_eq!(next_artist(&players, "amy"), Some("bob"));
        assert_eq!(next_artist(&players, "cat"), Some("amy"));
        assert_eq!(next_artist(&players, "gone"), Some("amy"));
        assert_eq!(next_artist(&[], "amy"), None);
    }

    #[test]
    fn test_voting_complete() {
        let players = roster(&["amy", "bob", "cat"]);
        let partial = ballots(&[("bob", Category::Poop)]);
        let full = ballots(&[("bob", Category::Poop), ("cat", Category::Cloud)]);

        assert!(!voting_complete(&players, "amy", &partial));
        assert!(voting_complete(&players, "amy", &full));
        assert!(!voting_complete(&roster(&["amy"]), "amy", &BTreeMap::new()));
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(normalize_name("  Amy ").unwrap(), "Amy");
        assert!(normalize_name("   ").is_err());
        assert!(normalize_name("a.b").is_err());
        assert!(normalize_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
    }

    #[test]
    fn test_comment_and_title_rules() {
        assert_eq!(normalize_comment(Some("  ")).unwrap(), None);
        assert_eq!(normalize_comment(None).unwrap(), None);
        assert_eq!(normalize_comment(Some(" fluffy ")).unwrap().as_deref(), Some("fluffy"));
        assert!(normalize_comment(Some(&"y".repeat(MAX_COMMENT_CHARS + 1))).is_err());
        assert!(normalize_title("").is_err());
        assert!(validate_drawing("data:image/png;base64,iVBOR").is_ok());
        assert!(validate_drawing("http://example.com/a.png").is_err());
    }
}
