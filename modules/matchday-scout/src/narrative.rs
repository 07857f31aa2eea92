//! Renders a snapshot into the analysis prompt sent to every backend.

use std::fmt::{self, Display, Formatter};

use matchday_common::{Formation, Snapshot, StandingLine};

/// System message for backends with a separate system role.
pub const SYSTEM_PREAMBLE: &str =
    "You are a helpful assistant that provides football match analysis and predictions.";

const PREAMBLE: &str = "You are an expert football analyst and prediction model. \
                        Based on the provided match data, generate a detailed predictive analysis.";

const NO_ABSENCES: &str = "No reported absences";
const NO_LINEUP: &str = "No lineup available";
const NO_MATCHES: &str = "No recent matches available";
const UNKNOWN: &str = "Unknown";

const INSTRUCTIONS: &str = r#"Simulate the match based on the data provided and generate a detailed predictive analysis.
Analyze all provided data and respond with a single JSON object in exactly this format:
{
    "homeTeamWinPercentage": number,     // Probability of home team victory (0-100)
    "awayTeamWinPercentage": number,     // Probability of away team victory (0-100)
    "drawPercentage": number,            // Probability of a draw (0-100)
    "over2_5Percentage": number,         // Likelihood of over 2.5 goals
    "bothTeamScorePercentage": number,   // Probability of both teams scoring
    "halfTimeWinner": "home" | "away" | "draw",  // Predicted half-time result
    "halfTimeWinnerPercentage": number,  // Confidence in half-time prediction
    "predictedScore": {
        "home": number,                  // Predicted goals for home team
        "away": number                   // Predicted goals for away team
    },
    "predictionConfidence": number,      // Overall confidence in prediction
    "briefComment": string               // Key factors behind the prediction
}

Critical Requirements:
1. All percentages must be numbers from 0 to 100
2. Win percentages (home, away, draw) must sum exactly to 100
3. The brief comment should explain the prediction using team strengths and formations
4. Prediction confidence should reflect:
   - Data completeness
   - Form consistency
   - Weather impact
   - Squad availability
   - Starting lineup quality
   - Tactical matchup (formations)
5. Consider:
   - Team formations and player positions
   - Individual player matchups
   - Recent form and consistency
   - Head-to-head history
   - Weather conditions impact
   - Available players and team strength
   - Home/away advantage

Return ONLY the JSON object without any additional text or formatting."#;

/// Deterministic: the same snapshot always renders to the same text.
pub fn render(snapshot: &Snapshot) -> String {
    Narrative(snapshot).to_string()
}

struct Narrative<'a>(&'a Snapshot);

impl Display for Narrative<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = self.0;
        let home = s.home_team();
        let away = s.away_team();

        writeln!(f, "{PREAMBLE}\n")?;

        writeln!(f, "Match Information:")?;
        writeln!(f, "- ID: {}", s.id())?;
        writeln!(f, "- Teams: {home} vs {away}")?;
        writeln!(f, "- Venue: {}\n", s.venue())?;

        writeln!(f, "Team Formations and Lineups:")?;
        write_formation(f, home, &s.lineups().home)?;
        write_formation(f, away, &s.lineups().away)?;

        writeln!(f, "Standings:")?;
        let standings = s.standings();
        write_standing(f, &format!("{home} Standings"), &standings.home.overall)?;
        write_standing(f, &format!("{home} Home Standings"), &standings.home.home_form)?;
        write_standing(f, &format!("{home} Away Standings"), &standings.home.away_form)?;
        write_standing(f, &format!("{away} Standings"), &standings.away.overall)?;
        write_standing(f, &format!("{away} Home Standings"), &standings.away.home_form)?;
        write_standing(f, &format!("{away} Away Standings"), &standings.away.away_form)?;

        let weather = s.weather();
        writeln!(f, "Environmental Conditions:")?;
        writeln!(f, "- Temperature: {:.1}°C", weather.temperature)?;
        writeln!(f, "- Weather: {}", weather.condition)?;
        writeln!(f, "- Humidity: {}%", weather.humidity)?;
        writeln!(f, "- Wind Speed: {:.1} km/h\n", weather.wind_speed)?;

        let form = s.recent_form();
        writeln!(f, "Team Form Analysis:")?;
        writeln!(f, "{home} Recent Form:")?;
        write_list(f, &form.home, NO_MATCHES)?;
        writeln!(f, "{away} Recent Form:")?;
        write_list(f, &form.away, NO_MATCHES)?;

        writeln!(f, "Head-to-Head History:")?;
        write_list(f, &form.between, NO_MATCHES)?;

        let absences = s.unavailable_players();
        writeln!(f, "Squad Status:")?;
        writeln!(f, "{home} Unavailable Players:")?;
        write_list(f, &absences.home, NO_ABSENCES)?;
        writeln!(f, "{away} Unavailable Players:")?;
        write_list(f, &absences.away, NO_ABSENCES)?;

        f.write_str(INSTRUCTIONS)
    }
}

fn write_formation(f: &mut Formatter<'_>, team: &str, formation: &Formation) -> fmt::Result {
    let label = formation.formation.as_deref().unwrap_or(UNKNOWN);
    writeln!(f, "{team} ({label}):")?;

    if !formation.is_available() {
        return writeln!(f, "{NO_LINEUP}\n");
    }
    for player in &formation.players {
        match player.number {
            Some(number) => writeln!(f, "{number}. {} ({})", player.name, player.position)?,
            None => writeln!(f, "?. {} ({})", player.name, player.position)?,
        }
    }
    writeln!(f)
}

fn write_standing(f: &mut Formatter<'_>, heading: &str, line: &StandingLine) -> fmt::Result {
    writeln!(f, "{heading}:")?;
    if line.is_unknown() {
        return writeln!(f, "- {UNKNOWN}\n");
    }
    writeln!(f, "- Position: {}", line.position)?;
    writeln!(f, "- Played: {}", line.played)?;
    writeln!(f, "- Won: {}", line.won)?;
    writeln!(f, "- Drawn: {}", line.drawn)?;
    writeln!(f, "- Lost: {}", line.lost)?;
    writeln!(f, "- Goals For: {}", line.goals_for)?;
    writeln!(f, "- Goals Against: {}", line.goals_against)?;
    writeln!(f, "- Goal Difference: {:+}", line.goal_difference)?;
    writeln!(f, "- Points: {}\n", line.points)
}

fn write_list(f: &mut Formatter<'_>, items: &[String], placeholder: &str) -> fmt::Result {
    if items.is_empty() {
        return writeln!(f, "{placeholder}\n");
    }
    for item in items {
        writeln!(f, "{item}")?;
    }
    writeln!(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot_for, snapshot_with};
    use matchday_common::{Environment, Player};

    fn position_of(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("{needle:?} missing from prompt"))
    }

    #[test]
    fn same_snapshot_renders_identically() {
        let snapshot = snapshot_for("Arsenal", "Chelsea");
        assert_eq!(render(&snapshot), render(&snapshot.clone()));
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let prompt = render(&snapshot_for("Arsenal", "Chelsea"));
        let sections = [
            "You are an expert football analyst",
            "Match Information:",
            "Team Formations and Lineups:",
            "Standings:",
            "Arsenal Standings:",
            "Arsenal Home Standings:",
            "Arsenal Away Standings:",
            "Chelsea Standings:",
            "Chelsea Home Standings:",
            "Chelsea Away Standings:",
            "Environmental Conditions:",
            "Team Form Analysis:",
            "Arsenal Recent Form:",
            "Chelsea Recent Form:",
            "Head-to-Head History:",
            "Squad Status:",
            "Arsenal Unavailable Players:",
            "Chelsea Unavailable Players:",
            "homeTeamWinPercentage",
        ];
        let offsets: Vec<_> = sections.iter().map(|s| position_of(&prompt, s)).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]), "{offsets:?}");
    }

    #[test]
    fn defaulted_snapshot_uses_placeholders() {
        let prompt = render(&snapshot_for("Arsenal", "Chelsea"));
        assert!(prompt.contains("- ID: arsenal-vs-chelsea"));
        assert!(prompt.contains("- Venue: Arsenal Stadium"));
        assert!(prompt.contains("Arsenal (Unknown):\nNo lineup available"));
        assert!(prompt.contains("Arsenal Standings:\n- Unknown"));
        assert!(prompt.contains("Head-to-Head History:\nNo recent matches available"));
        assert!(prompt.contains("Chelsea Unavailable Players:\nNo reported absences"));
        assert!(prompt.contains("- Temperature: 20.0°C"));
        assert!(prompt.contains("- Humidity: 50%"));
        assert!(prompt.contains("- Wind Speed: 5.0 km/h"));
    }

    #[test]
    fn populated_snapshot_lists_details() {
        let snapshot = snapshot_with("Arsenal", "Chelsea", |parts| {
            parts.lineups.home.formation = Some("4-3-3".to_string());
            parts.lineups.home.players = vec![
                Player {
                    number: Some(7),
                    name: "Bukayo Saka".to_string(),
                    position: "RW".to_string(),
                },
                Player::unknown(),
            ];
            parts.standings.home.overall.position = 2;
            parts.standings.home.overall.goal_difference = -4;
            parts.recent_form.between = vec!["Arsenal 3-1 Chelsea".to_string()];
            parts.unavailable_players.away = vec!["Reece James".to_string()];
            parts.weather = Environment {
                temperature: 11.46,
                condition: "light rain".to_string(),
                humidity: 81,
                wind_speed: 14.832,
            };
        });

        let prompt = render(&snapshot);
        assert!(prompt.contains("Arsenal (4-3-3):\n7. Bukayo Saka (RW)\n?. Unknown (Unknown)\n"));
        assert!(prompt.contains("- Position: 2\n"));
        assert!(prompt.contains("- Goal Difference: -4\n"));
        assert!(prompt.contains("Head-to-Head History:\nArsenal 3-1 Chelsea\n"));
        assert!(prompt.contains("Chelsea Unavailable Players:\nReece James\n"));
        assert!(prompt.contains("- Temperature: 11.5°C"));
        assert!(prompt.contains("- Wind Speed: 14.8 km/h"));
    }

    #[test]
    fn instruction_block_closes_prompt() {
        let prompt = render(&snapshot_for("Arsenal", "Chelsea"));
        for field in [
            "awayTeamWinPercentage",
            "drawPercentage",
            "over2_5Percentage",
            "bothTeamScorePercentage",
            "\"halfTimeWinner\": \"home\" | \"away\" | \"draw\"",
            "halfTimeWinnerPercentage",
            "predictedScore",
            "predictionConfidence",
            "briefComment",
            "must sum exactly to 100",
        ] {
            assert!(prompt.contains(field), "{field} missing");
        }
        assert!(prompt.ends_with(
            "Return ONLY the JSON object without any additional text or formatting."
        ));
    }
}
