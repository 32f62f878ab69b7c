//! # Catalog Slugs
//!
//! Human-readable identifiers used in storage paths and public URLs.
//! A slug is derived once, at entry creation, from the entry title plus a
//! base36-encoded creation timestamp — unique without a lookup round trip,
//! and stable for the life of the entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of the slugified title portion (before the timestamp
/// suffix). Keeps storage keys well under object-store path limits.
const MAX_TITLE_SEGMENT: usize = 60;

/// A validated catalog slug.
///
/// Slugs appear verbatim inside object-store paths, so the constructor
/// rejects anything that could escape a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

/// Errors from parsing a slug.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SlugError {
    /// Slug is empty.
    #[error("slug must not be empty")]
    Empty,

    /// Slug contains a character outside `[a-z0-9-]`.
    #[error("slug {0:?} contains characters outside [a-z0-9-]")]
    InvalidCharacter(String),
}

impl Slug {
    /// Derive a slug from an entry title and its creation instant.
    ///
    /// The title is lowercased, runs of non-alphanumeric characters collapse
    /// to a single `-`, and the result is truncated to 60 characters. The
    /// millisecond timestamp is appended in base36 so two entries with the
    /// same title never collide in practice.
    pub fn generate(title: &str, at: DateTime<Utc>) -> Slug {
        let mut segment = String::with_capacity(title.len().min(MAX_TITLE_SEGMENT));
        let mut last_dash = true; // suppress a leading dash
        for ch in title.chars() {
            if segment.len() >= MAX_TITLE_SEGMENT {
                break;
            }
            if ch.is_ascii_alphanumeric() {
                segment.extend(ch.to_lowercase());
                last_dash = false;
            } else if !last_dash {
                segment.push('-');
                last_dash = true;
            }
        }
        while segment.ends_with('-') {
            segment.pop();
        }
        if segment.is_empty() {
            segment.push_str("entry");
        }

        let millis = at.timestamp_millis().max(0) as u64;
        Slug(format!("{segment}-{}", base36(millis)))
    }

    /// The slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SlugError::InvalidCharacter(s.to_string()));
        }
        Ok(Slug(s.to_string()))
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> String {
        slug.0
    }
}

/// Encode a number in lowercase base36.
fn base36(mut n: u64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    // ALPHABET is ASCII, so the bytes form valid UTF-8.
    String::from_utf8(digits).unwrap_or_default()
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn generate_lowercases_and_dashes() {
        let slug = Slug::generate("My SaaS Starter Kit", fixed_instant());
        assert!(slug.as_str().starts_with("my-saas-starter-kit-"));
    }

    #[test]
    fn generate_collapses_symbol_runs() {
        let slug = Slug::generate("Hello --- World!!!", fixed_instant());
        assert!(slug.as_str().starts_with("hello-world-"));
    }

    #[test]
    fn generate_is_deterministic_for_same_instant() {
        let a = Slug::generate("Dashboard", fixed_instant());
        let b = Slug::generate("Dashboard", fixed_instant());
        assert_eq!(a, b);
    }

    #[test]
    fn generate_differs_across_instants() {
        let a = Slug::generate("Dashboard", fixed_instant());
        let b = Slug::generate("Dashboard", fixed_instant() + chrono::Duration::milliseconds(1));
        assert_ne!(a, b);
    }

    #[test]
    fn generate_handles_symbol_only_titles() {
        let slug = Slug::generate("!!!", fixed_instant());
        assert!(slug.as_str().starts_with("entry-"));
    }

    #[test]
    fn generate_truncates_long_titles() {
        let long = "x".repeat(500);
        let slug = Slug::generate(&long, fixed_instant());
        // 60-char segment + dash + base36 suffix.
        assert!(slug.as_str().len() <= MAX_TITLE_SEGMENT + 14);
    }

    #[test]
    fn parse_accepts_generated_slugs() {
        let slug = Slug::generate("Commerce Template", fixed_instant());
        let parsed: Slug = slug.as_str().parse().unwrap();
        assert_eq!(parsed, slug);
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!("".parse::<Slug>(), Err(SlugError::Empty));
    }

    #[test]
    fn parse_rejects_path_separators() {
        assert!(matches!(
            "foo/bar".parse::<Slug>(),
            Err(SlugError::InvalidCharacter(_))
        ));
        assert!("foo bar".parse::<Slug>().is_err());
        assert!("Foo-bar".parse::<Slug>().is_err());
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1_771_059_600_000), "mlm35pc0");
    }
}
