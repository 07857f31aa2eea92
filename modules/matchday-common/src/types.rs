use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::fixture::FixtureKey;

// =============================================================================
// Lineups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub number: Option<u32>,
    pub name: String,
    pub position: String,
}

impl Player {
    /// Placeholder for a lineup row that could not be parsed.
    pub fn unknown() -> Self {
        Self {
            number: None,
            name: "Unknown".to_string(),
            position: "Unknown".to_string(),
        }
    }
}

/// A team's formation label and starting players. An empty player list means
/// the lineup is not available yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formation {
    pub formation: Option<String>,
    pub players: Vec<Player>,
}

impl Formation {
    pub fn is_available(&self) -> bool {
        !self.players.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lineups {
    pub home: Formation,
    pub away: Formation,
}

// =============================================================================
// Standings
// =============================================================================

/// One row of a league table.
///
/// League positions start at 1, so `position == 0` marks the "unknown" line
/// produced when a row could not be read. A genuine season-start record
/// (0 played, 0 points) still carries a real position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingLine {
    pub position: u32,
    pub team: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
}

impl StandingLine {
    pub fn unknown(team: impl Into<String>) -> Self {
        Self {
            position: 0,
            team: team.into(),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            points: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.position == 0
    }
}

/// A team's table rows in three contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub overall: StandingLine,
    pub home_form: StandingLine,
    pub away_form: StandingLine,
}

impl Standing {
    pub fn unknown(team: &str) -> Self {
        Self {
            overall: StandingLine::unknown(team),
            home_form: StandingLine::unknown(team),
            away_form: StandingLine::unknown(team),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub home: Standing,
    pub away: Standing,
}

// =============================================================================
// Squad news and form
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absences {
    pub home: Vec<String>,
    pub away: Vec<String>,
}

/// Recent result strings for each side and for head-to-head meetings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentForm {
    pub home: Vec<String>,
    pub away: Vec<String>,
    pub between: Vec<String>,
}

// =============================================================================
// Environment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Conditions at the venue. `Environment::default()` is the sentinel used
/// whenever geocoding or the weather lookup fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Degrees Celsius.
    pub temperature: f64,
    pub condition: String,
    /// Relative humidity, percent.
    pub humidity: u8,
    /// km/h.
    pub wind_speed: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            condition: "Unknown".to_string(),
            humidity: 50,
            wind_speed: 5.0,
        }
    }
}

impl Environment {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything gathered for one fixture.
///
/// Built once by the assembler from [`SnapshotParts`] and only read afterwards;
/// a later re-scrape produces a new snapshot that replaces the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    id: FixtureKey,
    home_team: String,
    away_team: String,
    venue: String,
    weather: Environment,
    lineups: Lineups,
    standings: Standings,
    unavailable_players: Absences,
    recent_form: RecentForm,
    assembled_at: DateTime<Utc>,
    #[serde(default)]
    degraded: Vec<String>,
}

/// The fragments a snapshot is assembled from.
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub home_team: String,
    pub away_team: String,
    pub venue: String,
    pub weather: Environment,
    pub lineups: Lineups,
    pub standings: Standings,
    pub unavailable_players: Absences,
    pub recent_form: RecentForm,
    /// Names of fragments that fell back to their defaults.
    pub degraded: Vec<String>,
}

impl Snapshot {
    pub fn from_parts(id: FixtureKey, parts: SnapshotParts, assembled_at: DateTime<Utc>) -> Self {
        Self {
            id,
            home_team: parts.home_team,
            away_team: parts.away_team,
            venue: parts.venue,
            weather: parts.weather,
            lineups: parts.lineups,
            standings: parts.standings,
            unavailable_players: parts.unavailable_players,
            recent_form: parts.recent_form,
            assembled_at,
            degraded: parts.degraded,
        }
    }

    pub fn id(&self) -> &FixtureKey {
        &self.id
    }

    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn weather(&self) -> &Environment {
        &self.weather
    }

    pub fn lineups(&self) -> &Lineups {
        &self.lineups
    }

    pub fn standings(&self) -> &Standings {
        &self.standings
    }

    pub fn unavailable_players(&self) -> &Absences {
        &self.unavailable_players
    }

    pub fn recent_form(&self) -> &RecentForm {
        &self.recent_form
    }

    pub fn assembled_at(&self) -> DateTime<Utc> {
        self.assembled_at
    }

    pub fn degraded(&self) -> &[String] {
        &self.degraded
    }
}

// =============================================================================
// Commentary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Text(String),
    Error(String),
}

/// One backend's answer, or the reason it has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentarySlot {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CommentarySlot {
    pub fn text(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            outcome: Outcome::Text(text.into()),
        }
    }

    pub fn error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            outcome: Outcome::Error(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

/// One slot per configured backend, in configured order.
pub type CommentaryResult = Vec<CommentarySlot>;

// =============================================================================
// Request / response
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub match_data: Snapshot,
    pub commentary: CommentaryResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Success(Analysis),
    Failure { error: String },
}

impl AnalyzeResponse {
    /// Map a pipeline outcome to an HTTP status code and response body.
    pub fn from_result(result: std::result::Result<Analysis, PipelineError>) -> (u16, Self) {
        match result {
            Ok(analysis) => (200, Self::Success(analysis)),
            Err(e) => (
                e.status_code(),
                Self::Failure {
                    error: e.to_string(),
                },
            ),
        }
    }
}
