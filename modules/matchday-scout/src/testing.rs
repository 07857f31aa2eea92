// Test mocks for the acquisition pipeline.
//
// One mock per trait boundary:
// - MockSessionProvider (SessionProvider): URL→HTML pages, counts sessions
// - MockEnvironmentSource (EnvironmentSource): scripted geocode/weather
// - MockModel (LanguageModel): replies, fails, stalls or panics on cue
// - MockSnapshotStore (SnapshotStore): in-memory store with failure switches
//
// Plus snapshot builders and `pages`, canned HTML for the data site.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::{AiError, LanguageModel};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use matchday_common::{
    Absences, Coordinates, Environment, FixtureKey, Lineups, RecentForm, Snapshot,
    SnapshotParts, Standing, Standings,
};

use crate::session::{Page, PageSession, SessionProvider};
use crate::store::{MemorySnapshotStore, SnapshotStore};

/// Emirates Stadium.
pub const EMIRATES: Coordinates = Coordinates {
    lat: 51.5549,
    lon: -0.1084,
};

// ---------------------------------------------------------------------------
// MockSessionProvider
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SessionLog {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    visited: Mutex<Vec<String>>,
}

/// HashMap-based page source. Unregistered URLs fail to navigate.
/// Builder pattern: `.on_page()`, `.panicking_on()`, `.with_latency()`,
/// `.slow_to_start()`, `.unavailable()`.
pub struct MockSessionProvider {
    pages: HashMap<String, String>,
    panic_on: Option<String>,
    latency: Option<Duration>,
    startup: Option<Duration>,
    available: bool,
    log: Arc<SessionLog>,
}

impl Default for MockSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            panic_on: None,
            latency: None,
            startup: None,
            available: true,
            log: Arc::new(SessionLog::default()),
        }
    }

    pub fn on_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    /// Every navigation sleeps this long first.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// `acquire` takes this long before handing out a session.
    pub fn slow_to_start(mut self, startup: Duration) -> Self {
        self.startup = Some(startup);
        self
    }

    /// `acquire` fails, as when the browser cannot start.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn acquisitions(&self) -> usize {
        self.log.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.log.releases.load(Ordering::SeqCst)
    }

    /// Every URL navigated to, across sessions, in order.
    pub fn visited(&self) -> Vec<String> {
        self.log.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>> {
        if let Some(startup) = self.startup {
            tokio::time::sleep(startup).await;
        }
        if !self.available {
            bail!("MockSessionProvider: browser unavailable");
        }
        self.log.acquisitions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            pages: self.pages.clone(),
            panic_on: self.panic_on.clone(),
            latency: self.latency,
            log: self.log.clone(),
            released: false,
        }))
    }
}

struct MockSession {
    pages: HashMap<String, String>,
    panic_on: Option<String>,
    latency: Option<Duration>,
    log: Arc<SessionLog>,
    released: bool,
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str, _ready_selector: Option<&str>) -> Result<Page> {
        self.log.visited.lock().unwrap().push(url.to_string());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.panic_on.as_deref() == Some(url) {
            panic!("MockSession: scripted panic on {url}");
        }

        self.pages
            .get(url)
            .map(|html| Page {
                url: url.to_string(),
                html: html.clone(),
            })
            .ok_or_else(|| anyhow!("MockSession: no page registered for {url}"))
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// MockEnvironmentSource
// ---------------------------------------------------------------------------

/// Geocodes every place to [`EMIRATES`] and reports mild weather unless told otherwise.
pub struct MockEnvironmentSource {
    coordinates: Option<Coordinates>,
    geocode_fails: bool,
    weather: Option<Environment>,
    geocode_calls: AtomicUsize,
    weather_calls: AtomicUsize,
}

impl Default for MockEnvironmentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEnvironmentSource {
    pub fn new() -> Self {
        Self {
            coordinates: Some(EMIRATES),
            geocode_fails: false,
            weather: Some(mild_weather()),
            geocode_calls: AtomicUsize::new(0),
            weather_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_match(mut self) -> Self {
        self.coordinates = None;
        self
    }

    pub fn failing_geocode(mut self) -> Self {
        self.geocode_fails = true;
        self
    }

    pub fn failing_weather(mut self) -> Self {
        self.weather = None;
        self
    }

    pub fn with_weather(mut self, weather: Environment) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::weather::EnvironmentSource for MockEnvironmentSource {
    async fn geocode(&self, place: &str) -> Result<Option<Coordinates>> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        if self.geocode_fails {
            bail!("MockEnvironmentSource: geocoder down for {place}");
        }
        Ok(self.coordinates)
    }

    async fn current_weather(&self, _at: Coordinates) -> Result<Environment> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);
        self.weather
            .clone()
            .ok_or_else(|| anyhow!("MockEnvironmentSource: weather service down"))
    }
}

pub fn mild_weather() -> Environment {
    Environment {
        temperature: 12.0,
        condition: "scattered clouds".to_string(),
        humidity: 62,
        wind_speed: 10.8,
    }
}

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

enum Behavior {
    Reply(String),
    Fail(String),
    Slow(Duration, String),
    Hang,
    Panic,
}

pub struct MockModel {
    name: String,
    behavior: Behavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockModel {
    fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn replying(name: &str, text: &str) -> Self {
        Self::new(name, Behavior::Reply(text.to_string()))
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self::new(name, Behavior::Fail(message.to_string()))
    }

    pub fn slow(name: &str, delay: Duration, text: &str) -> Self {
        Self::new(name, Behavior::Slow(delay, text.to_string()))
    }

    /// Never answers.
    pub fn hanging(name: &str) -> Self {
        Self::new(name, Behavior::Hang)
    }

    pub fn panicking(name: &str) -> Self {
        Self::new(name, Behavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> ai_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail(message) => Err(AiError::Network(message.clone())),
            Behavior::Slow(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("MockModel {}: scripted panic", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSnapshotStore
// ---------------------------------------------------------------------------

/// In-memory store whose reads or writes can be made to fail or stall.
#[derive(Default)]
pub struct MockSnapshotStore {
    inner: MemorySnapshotStore,
    fail_reads: bool,
    fail_writes: bool,
    stall: Option<Duration>,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MockSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Every read and write hangs for `stall` before doing its work.
    pub fn stalling(mut self, stall: Duration) -> Self {
        self.stall = Some(stall);
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Successful writes.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MockSnapshotStore {
    async fn get(&self, key: &FixtureKey) -> Result<Option<Snapshot>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if self.fail_reads {
            bail!("MockSnapshotStore: connection refused");
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &FixtureKey, snapshot: &Snapshot) -> Result<()> {
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if self.fail_writes {
            bail!("MockSnapshotStore: disk full");
        }
        self.inner.put(key, snapshot).await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot builders
// ---------------------------------------------------------------------------

/// A snapshot holding every fragment default, with a fixed timestamp.
pub fn snapshot_for(home_team: &str, away_team: &str) -> Snapshot {
    snapshot_with(home_team, away_team, |_| {})
}

/// Like [`snapshot_for`], with `edit` applied to the parts first.
pub fn snapshot_with(
    home_team: &str,
    away_team: &str,
    edit: impl FnOnce(&mut SnapshotParts),
) -> Snapshot {
    let mut parts = SnapshotParts {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        venue: format!("{home_team} Stadium"),
        weather: Environment::default(),
        lineups: Lineups::default(),
        standings: Standings {
            home: Standing::unknown(home_team),
            away: Standing::unknown(away_team),
        },
        unavailable_players: Absences::default(),
        recent_form: RecentForm::default(),
        degraded: Vec::new(),
    };
    edit(&mut parts);

    let assembled_at = Utc
        .with_ymd_and_hms(2024, 10, 19, 14, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    Snapshot::from_parts(FixtureKey::new(home_team, away_team), parts, assembled_at)
}

// ---------------------------------------------------------------------------
// Data-site pages
// ---------------------------------------------------------------------------

pub mod pages {
    use super::MockSessionProvider;
    use crate::extractors::SourceUrls;
    use matchday_common::FixtureKey;

    pub const VENUE: &str = "Emirates Stadium";

    pub fn venue(name: &str) -> String {
        format!(r#"<html><body><div class="venue-info">{name}</div></body></html>"#)
    }

    pub fn team_news(home: &[&str], away: &[&str]) -> String {
        format!(
            r#"<html><body>
                <div class="home-team"><ul class="unavailable-players">{}</ul></div>
                <div class="away-team"><ul class="unavailable-players">{}</ul></div>
            </body></html>"#,
            items(home),
            items(away)
        )
    }

    pub fn recent_matches(home: &[&str], away: &[&str], between: &[&str]) -> String {
        format!(
            r#"<html><body>
                <div class="home-team"><ul class="recent-matches">{}</ul></div>
                <div class="away-team"><ul class="recent-matches">{}</ul></div>
                <div class="head-to-head"><ul class="recent-matches">{}</ul></div>
            </body></html>"#,
            items(home),
            items(away),
            items(between)
        )
    }

    /// `players` rows are (number, name, position).
    pub fn lineups(
        home: (&str, &[(&str, &str, &str)]),
        away: (&str, &[(&str, &str, &str)]),
    ) -> String {
        format!(
            r#"<html><body>{}{}</body></html>"#,
            team_lineup("home-team", home.0, home.1),
            team_lineup("away-team", away.0, away.1)
        )
    }

    /// One row per team, identical across the three tables.
    pub fn standings(rows: &[[&str; 10]]) -> String {
        let body: String = rows
            .iter()
            .map(|cells| {
                let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
                format!("<tr>{tds}</tr>")
            })
            .collect();
        let header = "<tr><th>Pos</th><th>Team</th><th>P</th><th>W</th><th>D</th>\
                      <th>L</th><th>GF</th><th>GA</th><th>GD</th><th>Pts</th></tr>";

        ["overall-standings", "home-standings", "away-standings"]
            .iter()
            .map(|id| format!(r#"<table id="{id}">{header}{body}</table>"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Register a complete, healthy set of pages for one fixture.
    pub fn register_all(
        provider: MockSessionProvider,
        base: &str,
        home: &str,
        away: &str,
    ) -> MockSessionProvider {
        let urls = SourceUrls::new(base);
        let key = FixtureKey::new(home, away);

        provider
            .on_page(&urls.match_page(&key), venue(VENUE))
            .on_page(
                &urls.team_news(&key),
                team_news(&["Bukayo Saka (hamstring)"], &[]),
            )
            .on_page(
                &urls.recent_matches(&key),
                recent_matches(
                    &["W 2-0 vs Spurs", "D 1-1 vs Villa"],
                    &["L 0-1 vs City"],
                    &["Arsenal 3-1 Chelsea"],
                ),
            )
            .on_page(
                &urls.lineups(&key),
                lineups(
                    ("4-3-3", &[("1", "David Raya", "GK"), ("7", "Bukayo Saka", "RW")]),
                    ("4-2-3-1", &[("20", "Cole Palmer", "AM")]),
                ),
            )
            .on_page(
                &urls.standings(),
                standings(&[
                    ["2", home, "10", "7", "2", "1", "20", "8", "+12", "23"],
                    ["5", away, "10", "5", "2", "3", "15", "14", "1", "17"],
                ]),
            )
    }

    fn items(entries: &[&str]) -> String {
        entries.iter().map(|e| format!("<li>{e}</li>")).collect()
    }

    fn team_lineup(class: &str, formation: &str, players: &[(&str, &str, &str)]) -> String {
        let rows: String = players
            .iter()
            .map(|(number, name, position)| {
                format!(
                    r#"<li class="player"><span class="number">{number}</span><span class="name">{name}</span><span class="position">{position}</span></li>"#
                )
            })
            .collect();
        format!(
            r#"<div class="{class}"><span class="formation">{formation}</span><ul class="players">{rows}</ul></div>"#
        )
    }
}
