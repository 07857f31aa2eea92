use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;

use matchday_common::Absences;

use super::{require, texts, FixtureContext, FragmentExtractor};
use crate::session::PageSession;

const HOME_LIST: &str = ".home-team .unavailable-players";
const AWAY_LIST: &str = ".away-team .unavailable-players";

/// Injured and suspended players from the team-news page. A present but empty
/// list means no reported absences; a missing list fails the extraction.
pub struct AbsencesExtractor;

#[async_trait]
impl FragmentExtractor for AbsencesExtractor {
    type Fragment = Absences;

    fn name(&self) -> &'static str {
        "unavailable_players"
    }

    fn default_fragment(&self, _ctx: &FixtureContext) -> Absences {
        Absences::default()
    }

    async fn extract(&self, session: &mut dyn PageSession, ctx: &FixtureContext) -> Result<Absences> {
        let page = session
            .navigate(&ctx.urls.team_news(&ctx.key), Some(HOME_LIST))
            .await?;
        parse_absences(&page.html)
    }
}

pub(crate) fn parse_absences(html: &str) -> Result<Absences> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    Ok(Absences {
        home: texts(require(root, HOME_LIST)?, "li")?,
        away: texts(require(root, AWAY_LIST)?, "li")?,
    })
}
