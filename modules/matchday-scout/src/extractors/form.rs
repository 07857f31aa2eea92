use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;

use matchday_common::RecentForm;

use super::{require, texts, FixtureContext, FragmentExtractor};
use crate::session::PageSession;

const HOME_LIST: &str = ".home-team .recent-matches";
const AWAY_LIST: &str = ".away-team .recent-matches";
const HEAD_TO_HEAD_LIST: &str = ".head-to-head .recent-matches";

/// Recent results for each side and for past meetings between them.
pub struct FormExtractor;

#[async_trait]
impl FragmentExtractor for FormExtractor {
    type Fragment = RecentForm;

    fn name(&self) -> &'static str {
        "recent_form"
    }

    fn default_fragment(&self, _ctx: &FixtureContext) -> RecentForm {
        RecentForm::default()
    }

    async fn extract(&self, session: &mut dyn PageSession, ctx: &FixtureContext) -> Result<RecentForm> {
        let page = session
            .navigate(&ctx.urls.recent_matches(&ctx.key), Some(HOME_LIST))
            .await?;
        parse_form(&page.html)
    }
}

pub(crate) fn parse_form(html: &str) -> Result<RecentForm> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    Ok(RecentForm {
        home: texts(require(root, HOME_LIST)?, "li")?,
        away: texts(require(root, AWAY_LIST)?, "li")?,
        between: texts(require(root, HEAD_TO_HEAD_LIST)?, "li")?,
    })
}
