use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::warn;

use matchday_common::fixture::team_slug;
use matchday_common::{Standing, StandingLine, Standings};

use super::{clean_text, selector, FixtureContext, FragmentExtractor};
use crate::session::PageSession;

const OVERALL_TABLE: &str = "table#overall-standings";
const HOME_TABLE: &str = "table#home-standings";
const AWAY_TABLE: &str = "table#away-standings";
const COLUMNS: usize = 10;

/// League table rows for both teams, overall and split by home/away games.
pub struct StandingsExtractor;

#[async_trait]
impl FragmentExtractor for StandingsExtractor {
    type Fragment = Standings;

    fn name(&self) -> &'static str {
        "standings"
    }

    fn default_fragment(&self, ctx: &FixtureContext) -> Standings {
        Standings {
            home: Standing::unknown(&ctx.home_team),
            away: Standing::unknown(&ctx.away_team),
        }
    }

    async fn extract(&self, session: &mut dyn PageSession, ctx: &FixtureContext) -> Result<Standings> {
        let page = session
            .navigate(&ctx.urls.standings(), Some(OVERALL_TABLE))
            .await?;
        parse_standings(&page.html, &ctx.home_team, &ctx.away_team)
    }
}

pub(crate) fn parse_standings(html: &str, home_team: &str, away_team: &str) -> Result<Standings> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let tables = [OVERALL_TABLE, HOME_TABLE, AWAY_TABLE]
        .map(|css| selector(css).map(|sel| root.select(&sel).next()));
    let [overall, home, away] = tables;
    let (overall, home, away) = (overall?, home?, away?);

    if overall.is_none() && home.is_none() && away.is_none() {
        bail!("No standings tables on page");
    }

    let tables = [overall, home, away];
    Ok(Standings {
        home: team_standing(&tables, home_team)?,
        away: team_standing(&tables, away_team)?,
    })
}

/// One team's three lines. A team absent from any table gets the unknown
/// standing; an unreadable row only blanks that line.
fn team_standing(tables: &[Option<ElementRef<'_>>; 3], team: &str) -> Result<Standing> {
    let mut rows = Vec::with_capacity(3);
    for table in tables {
        match table.map(|t| find_row(t, team)).transpose()?.flatten() {
            Some(row) => rows.push(row),
            None => {
                warn!(team, "Team missing from standings table, using unknown standing");
                return Ok(Standing::unknown(team));
            }
        }
    }

    let line = |row: ElementRef<'_>| {
        parse_line(row).unwrap_or_else(|e| {
            warn!(team, error = %e, "Unreadable standings row");
            StandingLine::unknown("Unknown")
        })
    };

    Ok(Standing {
        overall: line(rows[0]),
        home_form: line(rows[1]),
        away_form: line(rows[2]),
    })
}

/// Prefer a row whose team cell names the team; fall back to any row that
/// mentions it.
fn find_row<'a>(table: ElementRef<'a>, team: &str) -> Result<Option<ElementRef<'a>>> {
    let rows = selector("tr")?;
    let cells = selector("td")?;
    let wanted = team_slug(team);
    let needle = team.to_lowercase();

    let exact = table.select(&rows).find(|row| {
        row.select(&cells)
            .nth(1)
            .is_some_and(|cell| team_slug(&clean_text(cell)) == wanted)
    });
    if exact.is_some() {
        return Ok(exact);
    }

    Ok(table
        .select(&rows)
        .find(|row| clean_text(*row).to_lowercase().contains(&needle)))
}

fn parse_line(row: ElementRef<'_>) -> Result<StandingLine> {
    let cells: Vec<String> = row.select(&selector("td")?).map(clean_text).collect();
    if cells.len() < COLUMNS {
        bail!("Expected {COLUMNS} cells, found {}", cells.len());
    }

    let count = |i: usize| -> Result<u32> {
        cells[i]
            .parse()
            .with_context(|| format!("Column {i} is not a count: {:?}", cells[i]))
    };

    let position = count(0)?;
    if position == 0 {
        bail!("League position must start at 1");
    }

    let goal_difference: i32 = cells[8]
        .replace('\u{2212}', "-")
        .parse()
        .with_context(|| format!("Goal difference is not a number: {:?}", cells[8]))?;

    Ok(StandingLine {
        position,
        team: cells[1].clone(),
        played: count(2)?,
        won: count(3)?,
        drawn: count(4)?,
        lost: count(5)?,
        goals_for: count(6)?,
        goals_against: count(7)?,
        goal_difference,
        points: count(9)?,
    })
}
