use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};

use matchday_common::{PipelineError, Result, Snapshot, SnapshotParts};

use crate::budget::StepBudget;
use crate::extractors::{
    run_extractor, AbsencesExtractor, Extraction, FixtureContext, FormExtractor,
    FragmentExtractor, LineupsExtractor, SourceUrls, StandingsExtractor, VenueExtractor,
};
use crate::session::{PageSession, SessionProvider};
use crate::store::SnapshotStore;
use crate::weather::Enricher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct Assembled {
    pub snapshot: Snapshot,
    pub source: SnapshotSource,
}

/// Cache lookup, then a full acquisition on miss.
pub struct Assembler {
    store: Arc<dyn SnapshotStore>,
    sessions: Arc<dyn SessionProvider>,
    enricher: Enricher,
    urls: SourceUrls,
    extract_timeout: Duration,
}

impl Assembler {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        sessions: Arc<dyn SessionProvider>,
        enricher: Enricher,
        urls: SourceUrls,
        extract_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            enricher,
            urls,
            extract_timeout,
        }
    }

    pub async fn assemble(
        &self,
        home_team: &str,
        away_team: &str,
        deadline: Option<Instant>,
    ) -> Result<Assembled> {
        let ctx = FixtureContext::new(home_team, away_team, self.urls.clone());
        let budget = StepBudget::new(self.extract_timeout, deadline);

        match budget.run(self.store.get(&ctx.key)).await {
            Ok(Ok(Some(snapshot))) => {
                info!(
                    fixture = %ctx.key,
                    assembled_at = %snapshot.assembled_at(),
                    "Snapshot served from store"
                );
                return Ok(Assembled {
                    snapshot,
                    source: SnapshotSource::Cache,
                });
            }
            Ok(Ok(None)) => info!(fixture = %ctx.key, "No stored snapshot, acquiring"),
            Ok(Err(e)) => warn!(fixture = %ctx.key, error = %e, "Snapshot lookup failed, treating as miss"),
            Err(timeout) => warn!(fixture = %ctx.key, %timeout, "Snapshot lookup stalled, treating as miss"),
        }

        let mut session = match budget.run(self.sessions.acquire()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(fixture = %ctx.key, error = %e, "Could not open acquisition session");
                return Err(PipelineError::SessionUnavailable(format!("{e:#}")));
            }
            Err(timeout) => {
                warn!(fixture = %ctx.key, %timeout, "Acquisition session did not open in time");
                return Err(PipelineError::SessionUnavailable(format!(
                    "session acquisition {timeout}"
                )));
            }
        };

        let parts = self.gather(session.as_mut(), &ctx, deadline).await;
        session.release().await;

        let snapshot = Snapshot::from_parts(ctx.key.clone(), parts, Utc::now());
        if !snapshot.degraded().is_empty() {
            info!(fixture = %ctx.key, degraded = ?snapshot.degraded(), "Snapshot assembled with defaults");
        }

        if budget.deadline_passed() {
            warn!(fixture = %ctx.key, "Deadline passed during acquisition, snapshot not stored");
        } else {
            match budget.run(self.store.put(&ctx.key, &snapshot)).await {
                Ok(Ok(())) => info!(fixture = %ctx.key, "Snapshot stored"),
                Ok(Err(e)) => warn!(fixture = %ctx.key, error = %e, "Failed to store snapshot"),
                Err(timeout) => warn!(fixture = %ctx.key, %timeout, "Snapshot write stalled, abandoned"),
            }
        }

        Ok(Assembled {
            snapshot,
            source: SnapshotSource::Fresh,
        })
    }

    /// Venue first; weather then runs beside the remaining extractors, which
    /// take turns on the session.
    async fn gather(
        &self,
        session: &mut dyn PageSession,
        ctx: &FixtureContext,
        deadline: Option<Instant>,
    ) -> SnapshotParts {
        let budget = StepBudget::new(self.extract_timeout, deadline);
        let mut degraded = Vec::new();

        let venue = run_extractor(&VenueExtractor, session, ctx, budget).await;
        note(&mut degraded, VenueExtractor.name(), &venue);
        let venue = venue.into_fragment();

        let extractions = async {
            let absences = run_extractor(&AbsencesExtractor, session, ctx, budget).await;
            let form = run_extractor(&FormExtractor, session, ctx, budget).await;
            let lineups = run_extractor(&LineupsExtractor, session, ctx, budget).await;
            let standings = run_extractor(&StandingsExtractor, session, ctx, budget).await;
            (absences, form, lineups, standings)
        };
        let (weather, (absences, form, lineups, standings)) =
            tokio::join!(self.enricher.environment_for(&venue, deadline), extractions);

        note(&mut degraded, AbsencesExtractor.name(), &absences);
        note(&mut degraded, FormExtractor.name(), &form);
        note(&mut degraded, LineupsExtractor.name(), &lineups);
        note(&mut degraded, StandingsExtractor.name(), &standings);
        note(&mut degraded, "weather", &weather);

        SnapshotParts {
            home_team: ctx.home_team.clone(),
            away_team: ctx.away_team.clone(),
            venue,
            weather: weather.into_fragment(),
            lineups: lineups.into_fragment(),
            standings: standings.into_fragment(),
            unavailable_players: absences.into_fragment(),
            recent_form: form.into_fragment(),
            degraded,
        }
    }
}

fn note<F>(degraded: &mut Vec<String>, name: &str, extraction: &Extraction<F>) {
    if extraction.is_default() {
        degraded.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;
    use crate::testing::{pages, snapshot_for, MockEnvironmentSource, MockSessionProvider, MockSnapshotStore};

    const BASE: &str = "https://data.test";

    fn assembler(store: Arc<dyn SnapshotStore>, sessions: Arc<MockSessionProvider>) -> Assembler {
        Assembler::new(
            store,
            sessions,
            Enricher::new(Arc::new(MockEnvironmentSource::new()), Duration::from_secs(5)),
            SourceUrls::new(BASE),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn cache_hit_skips_acquisition() {
        let store = Arc::new(MemorySnapshotStore::new().with_snapshot(snapshot_for("Arsenal", "Chelsea")));
        let sessions = Arc::new(MockSessionProvider::new());

        let assembled = assembler(store, sessions.clone())
            .assemble("arsenal", "chelsea", None)
            .await
            .unwrap();

        assert_eq!(assembled.source, SnapshotSource::Cache);
        assert_eq!(sessions.acquisitions(), 0);
    }

    #[tokio::test]
    async fn full_pages_produce_undegraded_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new());
        let sessions = Arc::new(pages::register_all(MockSessionProvider::new(), BASE, "Arsenal", "Chelsea"));

        let assembled = assembler(store.clone(), sessions.clone())
            .assemble("Arsenal", "Chelsea", None)
            .await
            .unwrap();

        let snapshot = &assembled.snapshot;
        assert_eq!(assembled.source, SnapshotSource::Fresh);
        assert_eq!(snapshot.venue(), "Emirates Stadium");
        assert!(snapshot.degraded().is_empty(), "{:?}", snapshot.degraded());
        assert_eq!(snapshot.lineups().home.formation.as_deref(), Some("4-3-3"));
        assert_eq!(snapshot.standings().away.overall.team, "Chelsea");
        assert_eq!(store.len().await, 1);
        assert_eq!(sessions.releases(), 1);
    }

    #[tokio::test]
    async fn extractors_read_pages_in_order() {
        let sessions = Arc::new(MockSessionProvider::new());
        assembler(Arc::new(MemorySnapshotStore::new()), sessions.clone())
            .assemble("Arsenal", "Chelsea", None)
            .await
            .unwrap();

        let visited = sessions.visited();
        let sections: Vec<_> = visited
            .iter()
            .map(|url| url.trim_start_matches(BASE).split('/').nth(1).unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            sections,
            ["matches", "team-news", "recent-matches", "lineups", "standings"]
        );
    }

    #[tokio::test]
    async fn session_failure_is_fatal_and_nothing_stored() {
        let store = Arc::new(MemorySnapshotStore::new());
        let sessions = Arc::new(MockSessionProvider::new().unavailable());

        let err = assembler(store.clone(), sessions)
            .assemble("Arsenal", "Chelsea", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::SessionUnavailable(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_read_failure_is_a_miss() {
        let store = Arc::new(MockSnapshotStore::new().failing_reads());
        let sessions = Arc::new(MockSessionProvider::new());

        let assembled = assembler(store.clone(), sessions.clone())
            .assemble("Arsenal", "Chelsea", None)
            .await
            .unwrap();

        assert_eq!(assembled.source, SnapshotSource::Fresh);
        assert_eq!(sessions.acquisitions(), 1);
        assert_eq!(store.puts(), 1);
    }

    #[tokio::test]
    async fn store_write_failure_is_not_surfaced() {
        let store = Arc::new(MockSnapshotStore::new().failing_writes());
        let sessions = Arc::new(MockSessionProvider::new());

        let assembled = assembler(store, sessions)
            .assemble("Arsenal", "Chelsea", None)
            .await;
        assert!(assembled.is_ok());
    }

    #[tokio::test]
    async fn panicking_extractor_defaults_and_session_is_released() {
        let sessions = Arc::new(
            pages::register_all(MockSessionProvider::new(), BASE, "Arsenal", "Chelsea")
                .panicking_on(&format!("{BASE}/lineups/arsenal-vs-chelsea")),
        );

        let assembled = assembler(Arc::new(MemorySnapshotStore::new()), sessions.clone())
            .assemble("Arsenal", "Chelsea", None)
            .await
            .unwrap();

        assert_eq!(assembled.snapshot.degraded(), ["lineups"]);
        assert!(!assembled.snapshot.lineups().home.is_available());
        assert_eq!(assembled.snapshot.venue(), "Emirates Stadium");
        assert_eq!(sessions.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_finished_after_deadline_is_not_stored() {
        let store = Arc::new(MemorySnapshotStore::new());
        let sessions = Arc::new(MockSessionProvider::new().with_latency(Duration::from_secs(3)));
        let deadline = Instant::now() + Duration::from_secs(1);

        let assembled = assembler(store.clone(), sessions.clone())
            .assemble("Arsenal", "Chelsea", Some(deadline))
            .await
            .unwrap();

        assert_eq!(assembled.snapshot.venue(), "Arsenal Stadium");
        assert!(assembled.snapshot.degraded().contains(&"venue".to_string()));
        assert!(store.is_empty().await);
        assert_eq!(sessions.releases(), 1);
    }
}
