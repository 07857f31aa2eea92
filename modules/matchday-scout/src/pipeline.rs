use std::sync::Arc;
use std::time::Duration;

use ai_client::LanguageModel;
use anyhow::Context;
use tokio::time::Instant;
use tracing::info;
use typed_builder::TypedBuilder;

use matchday_common::{Analysis, Config, PipelineError, Result, Timeouts};

use crate::assembler::{Assembled, Assembler};
use crate::backends::build_models;
use crate::budget::deadline_after;
use crate::commentary::{fan_out, FanOutLimits};
use crate::extractors::SourceUrls;
use crate::narrative;
use crate::session::{provider_from_config, SessionProvider};
use crate::store::{MemorySnapshotStore, PgSnapshotStore, SnapshotStore};
use crate::weather::{Enricher, OpenWeatherSource};

/// Team names in, snapshot plus per-backend commentary out.
#[derive(Clone, TypedBuilder)]
pub struct Pipeline {
    store: Arc<dyn SnapshotStore>,
    sessions: Arc<dyn SessionProvider>,
    enricher: Enricher,
    #[builder(default)]
    models: Vec<Arc<dyn LanguageModel>>,
    source_urls: SourceUrls,
    #[builder(default)]
    timeouts: Timeouts,
}

impl Pipeline {
    /// Wire the production collaborators described by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn SnapshotStore> = match &config.database_url {
            Some(url) => Arc::new(
                PgSnapshotStore::connect(url)
                    .await
                    .context("Snapshot store unavailable")?,
            ),
            None => {
                info!("DATABASE_URL not set, snapshots kept in memory");
                Arc::new(MemorySnapshotStore::new())
            }
        };

        let weather = OpenWeatherSource::new(
            &config.nominatim_url,
            &config.openweather_url,
            config.openweather_api_key.clone(),
        );

        Ok(Self::builder()
            .store(store)
            .sessions(provider_from_config(&config.page_backend))
            .enricher(Enricher::new(Arc::new(weather), config.timeouts.weather))
            .models(build_models(&config.providers))
            .source_urls(SourceUrls::new(&config.source_base_url))
            .timeouts(config.timeouts)
            .build())
    }

    /// Analyze under the configured request deadline, if any.
    pub async fn analyze(&self, home_team: &str, away_team: &str) -> Result<Analysis> {
        let deadline = self.timeouts.request_deadline.and_then(deadline_after);
        self.run(home_team, away_team, deadline).await
    }

    pub async fn analyze_with_deadline(
        &self,
        home_team: &str,
        away_team: &str,
        within: Duration,
    ) -> Result<Analysis> {
        self.run(home_team, away_team, deadline_after(within)).await
    }

    /// The snapshot alone, without commentary.
    pub async fn snapshot(&self, home_team: &str, away_team: &str) -> Result<Assembled> {
        let (home, away) = validate(home_team, away_team)?;
        let deadline = self.timeouts.request_deadline.and_then(deadline_after);
        self.assembler().assemble(home, away, deadline).await
    }

    async fn run(
        &self,
        home_team: &str,
        away_team: &str,
        deadline: Option<Instant>,
    ) -> Result<Analysis> {
        let (home, away) = validate(home_team, away_team)?;
        info!(home, away, "Analysis requested");

        let assembled = self.assembler().assemble(home, away, deadline).await?;
        let prompt = narrative::render(&assembled.snapshot);

        let commentary = fan_out(
            &prompt,
            &self.models,
            FanOutLimits {
                per_call: self.timeouts.provider,
                deadline,
            },
        )
        .await;

        Ok(Analysis {
            match_data: assembled.snapshot,
            commentary,
        })
    }

    fn assembler(&self) -> Assembler {
        Assembler::new(
            self.store.clone(),
            self.sessions.clone(),
            self.enricher.clone(),
            self.source_urls.clone(),
            self.timeouts.extract,
        )
    }
}

fn validate<'a>(home_team: &'a str, away_team: &'a str) -> Result<(&'a str, &'a str)> {
    let (home, away) = (home_team.trim(), away_team.trim());
    if home.is_empty() || away.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "Home team and away team are required".to_string(),
        ));
    }
    Ok((home, away))
}
