//! Source extractors: one per snapshot fragment, each reading a single page
//! through the fixture's acquisition session.
//!
//! Extractors report failure through `anyhow::Result`; [`run_extractor`] is
//! the one place that turns a failure, timeout or panic into the extractor's
//! default fragment.

pub mod absences;
pub mod form;
pub mod lineups;
pub mod standings;
pub mod venue;

pub use absences::AbsencesExtractor;
pub use form::FormExtractor;
pub use lineups::LineupsExtractor;
pub use standings::StandingsExtractor;
pub use venue::VenueExtractor;

use std::panic::AssertUnwindSafe;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use matchday_common::FixtureKey;

use crate::budget::{panic_message, StepBudget};
use crate::session::PageSession;

// =============================================================================
// Context
// =============================================================================

/// Page locations on the configured data site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    base: String,
}

impl SourceUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn match_page(&self, key: &FixtureKey) -> String {
        self.fixture_page("matches", key)
    }

    pub fn team_news(&self, key: &FixtureKey) -> String {
        self.fixture_page("team-news", key)
    }

    pub fn recent_matches(&self, key: &FixtureKey) -> String {
        self.fixture_page("recent-matches", key)
    }

    pub fn lineups(&self, key: &FixtureKey) -> String {
        self.fixture_page("lineups", key)
    }

    pub fn standings(&self) -> String {
        format!("{}/standings", self.base)
    }

    fn fixture_page(&self, section: &str, key: &FixtureKey) -> String {
        format!(
            "{}/{}/{}-vs-{}",
            self.base,
            section,
            key.home_slug(),
            key.away_slug()
        )
    }
}

/// What every extractor knows about the fixture it is working on.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    pub key: FixtureKey,
    pub home_team: String,
    pub away_team: String,
    pub urls: SourceUrls,
}

impl FixtureContext {
    pub fn new(home_team: &str, away_team: &str, urls: SourceUrls) -> Self {
        Self {
            key: FixtureKey::new(home_team, away_team),
            home_team: home_team.trim().to_string(),
            away_team: away_team.trim().to_string(),
            urls,
        }
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// A fragment, tagged with whether it was read or substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<F> {
    Extracted(F),
    Defaulted { fragment: F, cause: String },
}

impl<F> Extraction<F> {
    pub fn is_default(&self) -> bool {
        matches!(self, Extraction::Defaulted { .. })
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Extraction::Extracted(_) => None,
            Extraction::Defaulted { cause, .. } => Some(cause),
        }
    }

    pub fn fragment(&self) -> &F {
        match self {
            Extraction::Extracted(fragment) | Extraction::Defaulted { fragment, .. } => fragment,
        }
    }

    pub fn into_fragment(self) -> F {
        match self {
            Extraction::Extracted(fragment) | Extraction::Defaulted { fragment, .. } => fragment,
        }
    }
}

#[async_trait]
pub trait FragmentExtractor: Send + Sync {
    type Fragment: Send;

    fn name(&self) -> &'static str;

    /// Fragment used whenever extraction fails.
    fn default_fragment(&self, ctx: &FixtureContext) -> Self::Fragment;

    async fn extract(
        &self,
        session: &mut dyn PageSession,
        ctx: &FixtureContext,
    ) -> Result<Self::Fragment>;
}

/// Run one extractor under `budget`. Never fails: errors, timeouts and panics
/// all produce the extractor's default fragment.
pub async fn run_extractor<E>(
    extractor: &E,
    session: &mut dyn PageSession,
    ctx: &FixtureContext,
    budget: StepBudget,
) -> Extraction<E::Fragment>
where
    E: FragmentExtractor + ?Sized,
{
    let name = extractor.name();
    let attempt = AssertUnwindSafe(extractor.extract(session, ctx)).catch_unwind();

    let cause = match budget.run(attempt).await {
        Ok(Ok(Ok(fragment))) => {
            debug!(extractor = name, fixture = %ctx.key, "Fragment extracted");
            return Extraction::Extracted(fragment);
        }
        Ok(Ok(Err(e))) => format!("{e:#}"),
        Ok(Err(payload)) => format!("panicked: {}", panic_message(payload.as_ref())),
        Err(timeout) => timeout.to_string(),
    };

    warn!(extractor = name, fixture = %ctx.key, error = %cause, "Extractor failed, using default");
    Extraction::Defaulted {
        fragment: extractor.default_fragment(ctx),
        cause,
    }
}

// =============================================================================
// HTML helpers
// =============================================================================

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css:?}: {e}"))
}

/// Element text with runs of whitespace collapsed to single spaces.
pub(crate) fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First element matching `css` under `scope`, or an error naming the selector.
pub(crate) fn require<'a>(scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>> {
    scope
        .select(&selector(css)?)
        .next()
        .ok_or_else(|| anyhow!("Missing element {css:?}"))
}

/// Cleaned, non-empty texts of every element matching `css` under `scope`.
pub(crate) fn texts(scope: ElementRef<'_>, css: &str) -> Result<Vec<String>> {
    Ok(scope
        .select(&selector(css)?)
        .map(clean_text)
        .filter(|text| !text.is_empty())
        .collect())
}
