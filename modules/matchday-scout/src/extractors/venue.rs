use anyhow::{bail, Result};
use async_trait::async_trait;
use scraper::Html;

use super::{clean_text, require, FixtureContext, FragmentExtractor};
use crate::session::PageSession;

const VENUE: &str = ".venue-info";

/// Stadium name from the fixture's match page.
pub struct VenueExtractor;

#[async_trait]
impl FragmentExtractor for VenueExtractor {
    type Fragment = String;

    fn name(&self) -> &'static str {
        "venue"
    }

    fn default_fragment(&self, ctx: &FixtureContext) -> String {
        format!("{} Stadium", ctx.home_team)
    }

    async fn extract(&self, session: &mut dyn PageSession, ctx: &FixtureContext) -> Result<String> {
        let page = session
            .navigate(&ctx.urls.match_page(&ctx.key), Some(VENUE))
            .await?;
        parse_venue(&page.html)
    }
}

pub(crate) fn parse_venue(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let venue = clean_text(require(doc.root_element(), VENUE)?);
    if venue.is_empty() {
        bail!("Venue element is empty");
    }
    Ok(venue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::SourceUrls;

    #[test]
    fn reads_venue_text() {
        let html = r#"<html><body><div class="venue-info">
            Emirates   Stadium
        </div></body></html>"#;
        assert_eq!(parse_venue(html).unwrap(), "Emirates Stadium");
    }

    #[test]
    fn empty_venue_is_an_error() {
        assert!(parse_venue(r#"<div class="venue-info">  </div>"#).is_err());
        assert!(parse_venue("<div></div>").is_err());
    }

    #[test]
    fn default_names_home_ground() {
        let ctx = FixtureContext::new("Arsenal", "Chelsea", SourceUrls::new("https://x"));
        assert_eq!(VenueExtractor.default_fragment(&ctx), "Arsenal Stadium");
    }
}
