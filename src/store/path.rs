//! Logical store paths such as `votes/alice` or `gallery/{id}/comments/bob`.

use std::fmt;

use crate::errors::AppError;

/// Longest accepted segment, in bytes.
pub const MAX_SEGMENT_BYTES: usize = 768;

const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// A validated, non-empty path into the store tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// Parse a `/`-separated path. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let segments: Vec<String> = raw
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();

        for segment in &segments {
            validate_segment(segment)?;
        }

        Ok(Self { segments })
    }

    /// Path of a single top-level key.
    pub fn key(key: &str) -> Result<Self, AppError> {
        validate_segment(key)?;
        Ok(Self {
            segments: vec![key.to_string()],
        })
    }

    /// Extend the path by one segment.
    pub fn child(&self, segment: &str) -> Result<Self, AppError> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// The top-level key this path lives under.
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Segments below the top-level key.
    pub fn rest(&self) -> &[String] {
        &self.segments[1..]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Check a single segment against the key rules of the store.
pub fn validate_segment(segment: &str) -> Result<(), AppError> {
    if segment.is_empty() {
        return Err(AppError::Validation(
            "Path segments must not be empty".to_string(),
        ));
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(AppError::Validation(format!(
            "Path segment exceeds {} bytes",
            MAX_SEGMENT_BYTES
        )));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| FORBIDDEN.contains(c) || c.is_control())
    {
        return Err(AppError::Validation(format!(
            "Path segment {:?} contains forbidden character {:?}",
            segment, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_path() {
        let path = StorePath::parse("/gallery/abc/comments/bob/").unwrap();
        assert_eq!(path.root(), "gallery");
        assert_eq!(path.rest(), ["abc", "comments", "bob"]);
        assert_eq!(path.to_string(), "gallery/abc/comments/bob");
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(StorePath::parse("").is_err());
        assert!(StorePath::parse("votes//alice").is_err());
        assert!(StorePath::parse("votes/a.b").is_err());
        assert!(StorePath::parse("votes/$root").is_err());
        assert!(StorePath::key("a/b").is_err());
        assert!(validate_segment("tab\there").is_err());
        assert!(validate_segment(&"x".repeat(MAX_SEGMENT_BYTES + 1)).is_err());
    }

    #[test]
    fn test_child_extends() {
        let votes = StorePath::key("votes").unwrap();
        let alice = votes.child("Alice Smith").unwrap();
        assert_eq!(alice.to_string(), "votes/Alice Smith");
        assert!(votes.child("#1").is_err());
    }
}
