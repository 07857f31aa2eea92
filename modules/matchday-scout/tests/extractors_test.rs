//! Each extractor against a live (mock) session: real pages parse, broken or
//! missing pages fall back to the documented default.

use std::time::Duration;

use matchday_common::{Absences, Lineups, RecentForm, Standing, Standings};
use matchday_scout::budget::StepBudget;
use matchday_scout::extractors::{
    run_extractor, AbsencesExtractor, Extraction, FixtureContext, FormExtractor, LineupsExtractor,
    SourceUrls, StandingsExtractor, VenueExtractor,
};
use matchday_scout::session::{PageSession, SessionProvider};
use matchday_scout::testing::{pages, MockSessionProvider};

const BASE: &str = "https://data.test";

fn ctx() -> FixtureContext {
    FixtureContext::new("Arsenal", "Chelsea", SourceUrls::new(BASE))
}

fn budget() -> StepBudget {
    StepBudget::new(Duration::from_secs(5), None)
}

const BROKEN: &str = "<html><body><h1>Service unavailable</h1></body></html>";

/// A provider serving `html` at every extractor's URL.
fn serving(html: &str) -> MockSessionProvider {
    let ctx = ctx();
    let urls = &ctx.urls;
    MockSessionProvider::new()
        .on_page(&urls.match_page(&ctx.key), html)
        .on_page(&urls.team_news(&ctx.key), html)
        .on_page(&urls.recent_matches(&ctx.key), html)
        .on_page(&urls.lineups(&ctx.key), html)
        .on_page(&urls.standings(), html)
}

#[tokio::test]
async fn healthy_pages_are_extracted() {
    let provider = pages::register_all(MockSessionProvider::new(), BASE, "Arsenal", "Chelsea");
    let mut session = provider.acquire().await.unwrap();
    let ctx = ctx();

    let venue = run_extractor(&VenueExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(venue, Extraction::Extracted(pages::VENUE.to_string()));

    let absences = run_extractor(&AbsencesExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(absences.fragment().home, vec!["Bukayo Saka (hamstring)"]);

    let form = run_extractor(&FormExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(form.fragment().away, vec!["L 0-1 vs City"]);

    let lineups = run_extractor(&LineupsExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(lineups.fragment().home.players.len(), 2);

    let standings = run_extractor(&StandingsExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(standings.fragment().away.overall.position, 5);

    session.release().await;
}

#[tokio::test]
async fn missing_pages_yield_defaults() {
    let provider = MockSessionProvider::new();
    let mut session = provider.acquire().await.unwrap();
    let ctx = ctx();

    let venue = run_extractor(&VenueExtractor, session.as_mut(), &ctx, budget()).await;
    assert!(venue.cause().unwrap().contains("no page registered"));
    assert_eq!(venue.into_fragment(), "Arsenal Stadium");

    let absences = run_extractor(&AbsencesExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(absences.into_fragment(), Absences::default());

    let form = run_extractor(&FormExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(form.into_fragment(), RecentForm::default());

    let lineups = run_extractor(&LineupsExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(lineups.into_fragment(), Lineups::default());

    let standings = run_extractor(&StandingsExtractor, session.as_mut(), &ctx, budget()).await;
    assert_eq!(
        standings.into_fragment(),
        Standings {
            home: Standing::unknown("Arsenal"),
            away: Standing::unknown("Chelsea"),
        }
    );
}

#[tokio::test]
async fn malformed_pages_yield_defaults() {
    let provider = serving(BROKEN);
    let mut session = provider.acquire().await.unwrap();
    let ctx = ctx();

    assert!(run_extractor(&VenueExtractor, session.as_mut(), &ctx, budget()).await.is_default());
    assert!(run_extractor(&AbsencesExtractor, session.as_mut(), &ctx, budget()).await.is_default());
    assert!(run_extractor(&FormExtractor, session.as_mut(), &ctx, budget()).await.is_default());
    assert!(run_extractor(&LineupsExtractor, session.as_mut(), &ctx, budget()).await.is_default());
    assert!(run_extractor(&StandingsExtractor, session.as_mut(), &ctx, budget()).await.is_default());
    assert_eq!(provider.visited().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn slow_page_times_out_to_default() {
    let provider = pages::register_all(MockSessionProvider::new(), BASE, "Arsenal", "Chelsea")
        .with_latency(Duration::from_secs(30));
    let mut session = provider.acquire().await.unwrap();

    let venue = run_extractor(&VenueExtractor, session.as_mut(), &ctx(), budget()).await;
    assert_eq!(venue.cause(), Some("timed out after 5s"));
    assert_eq!(venue.into_fragment(), "Arsenal Stadium");
}

#[tokio::test]
async fn panicking_navigation_yields_default() {
    let ctx = ctx();
    let provider = MockSessionProvider::new().panicking_on(&ctx.urls.standings());
    let mut session = provider.acquire().await.unwrap();

    let standings = run_extractor(&StandingsExtractor, session.as_mut(), &ctx, budget()).await;
    assert!(standings.cause().unwrap().starts_with("panicked"));
    assert_eq!(standings.fragment().home, Standing::unknown("Arsenal"));
}
