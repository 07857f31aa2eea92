use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use matchday_common::{Coordinates, Environment};

use crate::budget::StepBudget;
use crate::extractors::Extraction;

const USER_AGENT: &str = "matchday-scout/0.1 (fixture weather lookup)";

/// Place lookup and current conditions.
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    /// `Ok(None)` when the place is unknown.
    async fn geocode(&self, place: &str) -> Result<Option<Coordinates>>;
    async fn current_weather(&self, at: Coordinates) -> Result<Environment>;
}

// =============================================================================
// Enricher
// =============================================================================

/// Resolves a venue to current conditions, falling back to
/// `Environment::default()` at every step.
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn EnvironmentSource>,
    step_timeout: Duration,
}

impl Enricher {
    pub fn new(source: Arc<dyn EnvironmentSource>, step_timeout: Duration) -> Self {
        Self {
            source,
            step_timeout,
        }
    }

    pub async fn environment_for(&self, venue: &str, deadline: Option<Instant>) -> Extraction<Environment> {
        let budget = StepBudget::new(self.step_timeout, deadline);

        let coordinates = match budget.run(self.source.geocode(venue)).await {
            Ok(Ok(Some(coordinates))) => coordinates,
            Ok(Ok(None)) => return fallback(venue, "no geocoding match".to_string()),
            Ok(Err(e)) => return fallback(venue, format!("geocoding failed: {e:#}")),
            Err(timeout) => return fallback(venue, format!("geocoding {timeout}")),
        };
        debug!(venue, lat = coordinates.lat, lon = coordinates.lon, "Venue geocoded");

        match budget.run(self.source.current_weather(coordinates)).await {
            Ok(Ok(environment)) => {
                info!(venue, condition = %environment.condition, "Weather resolved");
                Extraction::Extracted(environment)
            }
            Ok(Err(e)) => fallback(venue, format!("weather lookup failed: {e:#}")),
            Err(timeout) => fallback(venue, format!("weather lookup {timeout}")),
        }
    }
}

fn fallback(venue: &str, cause: String) -> Extraction<Environment> {
    warn!(venue, error = %cause, "Using default environment");
    Extraction::Defaulted {
        fragment: Environment::default(),
        cause,
    }
}

// =============================================================================
// Nominatim + OpenWeatherMap
// =============================================================================

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimPlace {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            lat: self.lat.trim().parse().ok()?,
            lon: self.lon.trim().parse().ok()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

impl OwmResponse {
    fn into_environment(self) -> Environment {
        Environment {
            temperature: self.main.temp,
            condition: self
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_else(|| "Unknown".to_string()),
            humidity: self.main.humidity.round().clamp(0.0, 100.0) as u8,
            // m/s under metric units
            wind_speed: (self.wind.speed * 3.6 * 10.0).round() / 10.0,
        }
    }
}

/// Geocoding through Nominatim, conditions through OpenWeatherMap.
pub struct OpenWeatherSource {
    http: reqwest::Client,
    nominatim_url: String,
    openweather_url: String,
    api_key: Option<String>,
}

impl OpenWeatherSource {
    pub fn new(nominatim_url: &str, openweather_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            nominatim_url: nominatim_url.trim_end_matches('/').to_string(),
            openweather_url: openweather_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl EnvironmentSource for OpenWeatherSource {
    async fn geocode(&self, place: &str) -> Result<Option<Coordinates>> {
        let places: Vec<NominatimPlace> = self
            .http
            .get(format!("{}/search", self.nominatim_url))
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .context("Nominatim request failed")?
            .error_for_status()
            .context("Nominatim returned an error status")?
            .json()
            .await
            .context("Unexpected Nominatim response")?;

        Ok(places.first().and_then(NominatimPlace::coordinates))
    }

    async fn current_weather(&self, at: Coordinates) -> Result<Environment> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENWEATHER_API_KEY not configured")?;

        let response: OwmResponse = self
            .http
            .get(format!("{}/data/2.5/weather", self.openweather_url))
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .context("OpenWeatherMap request failed")?
            .error_for_status()
            .context("OpenWeatherMap returned an error status")?
            .json()
            .await
            .context("Unexpected OpenWeatherMap response")?;

        Ok(response.into_environment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEnvironmentSource;

    fn enricher(source: Arc<MockEnvironmentSource>) -> Enricher {
        Enricher::new(source, Duration::from_secs(5))
    }

    #[test]
    fn nominatim_coordinates_parse_from_strings() {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(r#"[{"lat":"51.5549","lon":"-0.1084","display_name":"Emirates"}]"#)
                .unwrap();
        let c = places[0].coordinates().unwrap();
        assert_eq!(c.lat, 51.5549);
        assert_eq!(c.lon, -0.1084);

        let bad = NominatimPlace {
            lat: "north".to_string(),
            lon: "0".to_string(),
        };
        assert!(bad.coordinates().is_none());
    }

    #[test]
    fn owm_response_maps_to_environment() {
        let json = r#"{
            "main": {"temp": 11.46, "humidity": 81, "pressure": 1012},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
            "wind": {"speed": 4.12, "deg": 220}
        }"#;
        let env = serde_json::from_str::<OwmResponse>(json)
            .unwrap()
            .into_environment();

        assert_eq!(env.temperature, 11.46);
        assert_eq!(env.condition, "light rain");
        assert_eq!(env.humidity, 81);
        assert_eq!(env.wind_speed, 14.8);
    }

    #[test]
    fn owm_response_without_conditions_is_unknown() {
        let json = r#"{"main": {"temp": 3.0, "humidity": 90}}"#;
        let env = serde_json::from_str::<OwmResponse>(json)
            .unwrap()
            .into_environment();
        assert_eq!(env.condition, "Unknown");
        assert_eq!(env.wind_speed, 0.0);
    }

    #[tokio::test]
    async fn no_geocode_match_skips_weather_call() {
        let source = Arc::new(MockEnvironmentSource::new().without_match());
        let result = enricher(source.clone())
            .environment_for("Nowhere Park", None)
            .await;

        assert!(result.is_default());
        assert_eq!(result.into_fragment(), Environment::default());
        assert_eq!(source.geocode_calls(), 1);
        assert_eq!(source.weather_calls(), 0);
    }

    #[tokio::test]
    async fn geocode_error_skips_weather_call() {
        let source = Arc::new(MockEnvironmentSource::new().failing_geocode());
        let result = enricher(source.clone())
            .environment_for("Emirates Stadium", None)
            .await;

        assert!(result.cause().unwrap().contains("geocoding failed"));
        assert_eq!(source.weather_calls(), 0);
    }

    #[tokio::test]
    async fn weather_failure_returns_sentinel() {
        let source = Arc::new(MockEnvironmentSource::new().failing_weather());
        let result = enricher(source.clone())
            .environment_for("Emirates Stadium", None)
            .await;

        assert_eq!(result.fragment(), &Environment::default());
        assert_eq!(source.weather_calls(), 1);
    }

    #[tokio::test]
    async fn resolved_weather_is_extracted() {
        let conditions = Environment {
            temperature: 8.5,
            condition: "overcast clouds".to_string(),
            humidity: 70,
            wind_speed: 12.2,
        };
        let source = Arc::new(MockEnvironmentSource::new().with_weather(conditions.clone()));
        let result = enricher(source).environment_for("Emirates Stadium", None).await;
        assert_eq!(result, Extraction::Extracted(conditions));
    }

    #[tokio::test]
    async fn missing_api_key_fails_weather_lookup() {
        let source = OpenWeatherSource::new("http://127.0.0.1:9", "http://127.0.0.1:9", None);
        let err = source
            .current_weather(Coordinates { lat: 0.0, lon: 0.0 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENWEATHER_API_KEY"));
    }
}
