use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use matchday_common::{Formation, Lineups, Player};

use super::{clean_text, require, FixtureContext, FragmentExtractor};
use crate::session::PageSession;

const HOME_TEAM: &str = ".home-team";
const AWAY_TEAM: &str = ".away-team";
const FORMATION: &str = ".formation";
const PLAYER: &str = ".players .player";

/// Shirt numbers are sometimes rendered as "#7" or "7.".
static SHIRT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D*(\d{1,3})\D*$").expect("valid regex"));

/// Formation labels and starting players from the lineups page.
pub struct LineupsExtractor;

#[async_trait]
impl FragmentExtractor for LineupsExtractor {
    type Fragment = Lineups;

    fn name(&self) -> &'static str {
        "lineups"
    }

    fn default_fragment(&self, _ctx: &FixtureContext) -> Lineups {
        Lineups::default()
    }

    async fn extract(&self, session: &mut dyn PageSession, ctx: &FixtureContext) -> Result<Lineups> {
        let page = session
            .navigate(&ctx.urls.lineups(&ctx.key), Some(".home-team .formation"))
            .await?;
        parse_lineups(&page.html)
    }
}

pub(crate) fn parse_lineups(html: &str) -> Result<Lineups> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    Ok(Lineups {
        home: parse_formation(require(root, HOME_TEAM)?)?,
        away: parse_formation(require(root, AWAY_TEAM)?)?,
    })
}

fn parse_formation(team: ElementRef<'_>) -> Result<Formation> {
    let label = clean_text(require(team, FORMATION)?);
    let players = team
        .select(&super::selector(PLAYER)?)
        .map(|row| {
            parse_player(row).unwrap_or_else(|e| {
                debug!(error = %e, "Unreadable player row");
                Player::unknown()
            })
        })
        .collect();

    Ok(Formation {
        formation: (!label.is_empty()).then_some(label),
        players,
    })
}

fn parse_player(row: ElementRef<'_>) -> Result<Player> {
    let number_text = clean_text(require(row, ".number")?);
    let number = SHIRT_NUMBER
        .captures(&number_text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .with_context(|| format!("Unreadable shirt number {number_text:?}"))?;

    Ok(Player {
        number: Some(number),
        name: clean_text(require(row, ".name")?),
        position: clean_text(require(row, ".position")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_row(number: &str, name: &str, position: &str) -> String {
        format!(
            r#"<li class="player"><span class="number">{number}</span>
               <span class="name">{name}</span><span class="position">{position}</span></li>"#
        )
    }

    #[test]
    fn reads_formations_and_players() {
        let html = format!(
            r#"<div class="home-team"><span class="formation">4-3-3</span>
                 <ul class="players">{}{}</ul></div>
               <div class="away-team"><span class="formation">3-4-3</span>
                 <ul class="players">{}</ul></div>"#,
            player_row("1", "David Raya", "GK"),
            player_row("#7", "Bukayo Saka", "RW"),
            player_row("10.", "Cole Palmer", "AM"),
        );

        let lineups = parse_lineups(&html).unwrap();
        assert_eq!(lineups.home.formation.as_deref(), Some("4-3-3"));
        assert_eq!(lineups.home.players.len(), 2);
        assert_eq!(lineups.home.players[1].number, Some(7));
        assert_eq!(lineups.home.players[1].name, "Bukayo Saka");
        assert_eq!(lineups.away.players[0].number, Some(10));
        assert_eq!(lineups.away.players[0].position, "AM");
    }

    #[test]
    fn bad_player_row_becomes_unknown_player() {
        let html = format!(
            r#"<div class="home-team"><span class="formation">4-4-2</span>
                 <ul class="players">{}<li class="player"><span class="name">No number</span></li></ul></div>
               <div class="away-team"><span class="formation">4-4-2</span><ul class="players"></ul></div>"#,
            player_row("TBC", "Someone", "CB"),
        );

        let lineups = parse_lineups(&html).unwrap();
        assert_eq!(lineups.home.players, vec![Player::unknown(), Player::unknown()]);
        assert!(!lineups.away.is_available());
    }

    #[test]
    fn blank_formation_label_is_unknown() {
        let html = r#"<div class="home-team"><span class="formation"> </span></div>
                      <div class="away-team"><span class="formation">5-3-2</span></div>"#;
        let lineups = parse_lineups(html).unwrap();
        assert_eq!(lineups.home.formation, None);
        assert_eq!(lineups.away.formation.as_deref(), Some("5-3-2"));
    }

    #[test]
    fn missing_team_block_fails() {
        let html = r#"<div class="home-team"><span class="formation">4-3-3</span></div>"#;
        assert!(parse_lineups(html).is_err());
    }
}
