use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical identity of a fixture: `"<home-slug>-vs-<away-slug>"`.
///
/// Both the snapshot cache and the source-site URLs use the same team slugs,
/// so `"Arsenal"`, `" arsenal "` and `"ARSENAL"` always resolve to one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureKey(String);

impl FixtureKey {
    const SEPARATOR: &'static str = "-vs-";

    pub fn new(home_team: &str, away_team: &str) -> Self {
        Self(format!(
            "{}{}{}",
            team_slug(home_team),
            Self::SEPARATOR,
            team_slug(away_team)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn home_slug(&self) -> &str {
        self.split().0
    }

    pub fn away_slug(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        self.0
            .split_once(Self::SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for FixtureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case a team name and collapse every run of non-alphanumeric
/// characters into a single `-`.
pub fn team_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_case_and_whitespace_insensitive() {
        let a = FixtureKey::new("Arsenal", "Chelsea");
        let b = FixtureKey::new("  arsenal ", "CHELSEA");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "arsenal-vs-chelsea");
    }

    #[test]
    fn multi_word_names_stay_unambiguous() {
        let key = FixtureKey::new("Manchester United", "Brighton & Hove Albion");
        assert_eq!(key.as_str(), "manchester-united-vs-brighton-hove-albion");
        assert_eq!(key.home_slug(), "manchester-united");
        assert_eq!(key.away_slug(), "brighton-hove-albion");
    }

    #[test]
    fn slug_strips_punctuation_runs() {
        assert_eq!(team_slug("Paris Saint-Germain"), "paris-saint-germain");
        assert_eq!(team_slug("  A.F.C.  Bournemouth "), "a-f-c-bournemouth");
        assert_eq!(team_slug("Atlético Madrid"), "atlético-madrid");
    }

    #[test]
    fn display_matches_as_str() {
        let key = FixtureKey::new("Leeds", "Everton");
        assert_eq!(key.to_string(), key.as_str());
    }
}
