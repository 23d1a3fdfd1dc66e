use crate::config::FetchSettings;
use crate::error::{EtlError, Result};
use crate::models::{Location, RawObservation};
use crate::readers::response_cache::ResponseCache;
use crate::utils::constants::{COORDINATE_DECIMALS, HOURLY_VARIABLES};
use crate::utils::progress::ProgressReporter;
use crate::utils::timestamp::from_unix_seconds;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use validator::Validate;

/// Forecast payload: resolved grid point plus parallel hourly arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: HourlySeries,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HourlySeries {
    /// Unix seconds, UTC
    pub time: Vec<i64>,
    pub temperature_2m: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
}

impl ForecastResponse {
    /// Flatten the hourly arrays into observations for one location.
    ///
    /// Hours with a missing reading are skipped.
    pub fn into_observations(self, location_code: &str) -> Result<Vec<RawObservation>> {
        let HourlySeries {
            time,
            temperature_2m,
            wind_speed_10m,
        } = self.hourly;

        if time.len() != temperature_2m.len() || time.len() != wind_speed_10m.len() {
            return Err(EtlError::SourceFormat {
                location: location_code.to_string(),
                message: format!(
                    "hourly arrays differ in length (time={}, temperature_2m={}, wind_speed_10m={})",
                    time.len(),
                    temperature_2m.len(),
                    wind_speed_10m.len()
                ),
            });
        }

        let latitude = round_coordinate(self.latitude);
        let longitude = round_coordinate(self.longitude);
        let mut observations = Vec::with_capacity(time.len());
        let mut skipped = 0;

        for ((seconds, temperature), wind_speed) in
            time.into_iter().zip(temperature_2m).zip(wind_speed_10m)
        {
            let (Some(temperature), Some(wind_speed)) = (temperature, wind_speed) else {
                skipped += 1;
                continue;
            };

            let observation = RawObservation::new(
                from_unix_seconds(seconds)?,
                location_code,
                temperature,
                wind_speed,
                latitude,
                longitude,
            );
            observation
                .validate()
                .map_err(|e| EtlError::SourceFormat {
                    location: location_code.to_string(),
                    message: format!("reading at {} rejected: {}", seconds, e),
                })?;
            observations.push(observation);
        }

        if skipped > 0 {
            warn!(location = location_code, skipped, "Skipped hours with missing readings");
        }

        Ok(observations)
    }
}

fn decode(location: &Location, body: &str) -> Result<Vec<RawObservation>> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| EtlError::SourceDecode {
            location: location.code.clone(),
            source: e,
        })?;
    response.into_observations(&location.code)
}

/// Everything besides the coordinates that shapes a response body.
fn source_key(base_url: &str) -> String {
    format!(
        "{}?hourly={}&timezone=GMT&timeformat=unixtime",
        base_url, HOURLY_VARIABLES
    )
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

/// Per-location fetch results, keyed by location code.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    results: BTreeMap<String, Result<Vec<RawObservation>>>,
}

impl FetchOutcome {
    pub fn insert(&mut self, location_code: impl Into<String>, result: Result<Vec<RawObservation>>) {
        self.results.insert(location_code.into(), result);
    }

    pub fn results(&self) -> &BTreeMap<String, Result<Vec<RawObservation>>> {
        &self.results
    }

    pub fn failed_locations(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn succeeded_locations(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Concatenate the successful tables.
    ///
    /// Any failure is fatal unless `allow_partial` is set; a run where every
    /// location failed is always fatal.
    pub fn into_rows(self, allow_partial: bool) -> Result<Vec<RawObservation>> {
        let failed = self.failed_locations();
        let all_failed = !self.results.is_empty() && failed.len() == self.results.len();

        if !failed.is_empty() && (!allow_partial || all_failed) {
            return Err(EtlError::PartialFetch(failed));
        }

        Ok(self
            .results
            .into_values()
            .filter_map(|result| result.ok())
            .flatten()
            .collect())
    }
}

/// Client for the hourly forecast source.
///
/// Owns its HTTP transport (with retry/backoff) and response cache; build one
/// per run and pass it to whatever drives the fetch loop.
pub struct ForecastReader {
    client: ClientWithMiddleware,
    cache: ResponseCache,
    base_url: String,
}

impl ForecastReader {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let min_backoff = Duration::from_secs_f64(settings.backoff_secs);
        let max_backoff = min_backoff * 2u32.saturating_pow(settings.max_retries);
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(min_backoff, max_backoff)
            .build_with_max_retries(settings.max_retries);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("weather-star-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            cache: ResponseCache::new(
                &settings.cache_dir,
                Duration::from_secs(settings.cache_expiry_secs),
                &source_key(&settings.base_url),
            ),
            base_url: settings.base_url.clone(),
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetch one location's hourly series, using the cache when fresh.
    pub async fn fetch(&self, location: &Location) -> Result<Vec<RawObservation>> {
        match self.cache.get(location).await? {
            Some(body) => {
                info!(location = %location.code, "Cache hit");
                decode(location, &body)
            }
            None => {
                info!(location = %location.code, "Cache miss, requesting forecast");
                let body = self.request(location).await?;
                self.accept_response(location, &body).await
            }
        }
    }

    /// Decode a fresh response and cache it only once it converts cleanly.
    async fn accept_response(
        &self,
        location: &Location,
        body: &str,
    ) -> Result<Vec<RawObservation>> {
        let rows = decode(location, body)?;
        self.cache.put(location, body).await?;
        Ok(rows)
    }

    async fn request(&self, location: &Location) -> Result<String> {
        let query = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("timezone", "GMT".to_string()),
            ("timeformat", "unixtime".to_string()),
        ];
        debug!(url = %self.base_url, ?query, "Sending forecast request");

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| EtlError::SourceRequest {
                location: location.code.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(location = %location.code, %status, "Forecast request rejected");
            return Err(EtlError::SourceStatus {
                location: location.code.clone(),
                status,
            });
        }

        response.text().await.map_err(|e| EtlError::SourceRequest {
            location: location.code.clone(),
            source: e.into(),
        })
    }

    /// Fetch every location in turn, recording each result separately.
    pub async fn fetch_all(
        &self,
        locations: &[Location],
        progress: Option<&ProgressReporter>,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for location in locations {
            if let Some(p) = progress {
                p.set_message(&location.code);
            }

            let result = self.fetch(location).await;
            match &result {
                Ok(rows) => info!(location = %location.code, rows = rows.len(), "Fetched forecast"),
                Err(e) => warn!(location = %location.code, error = %e, "Fetch failed"),
            }
            outcome.insert(location.code.clone(), result);

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        outcome
    }
}
