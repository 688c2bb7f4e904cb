//! Open-Meteo forecast provider: free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::error::{Result, SkycastError};
use skycast_core::traits::WeatherProvider;
use skycast_core::types::{ForecastSeries, ForecastSlot, HourlyRecord};

const HOURLY_FIELDS: &str = "temperature_2m,weathercode,precipitation_probability";
const FORECAST_DAYS: u8 = 2;
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weathercode: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
}

/// `WeatherProvider` backed by `GET /v1/forecast`.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
    timezone: String,
}

impl OpenMeteoProvider {
    /// `timezone` is the IANA name hourly timestamps are returned in.
    pub fn new(base_url: &str, timezone: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SkycastError::Upstream(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timezone: timezone.to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn name(&self) -> &str {
        "open-meteo"
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastSeries> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|e| SkycastError::Upstream(format!("Open-Meteo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkycastError::Upstream(format!(
                "Open-Meteo returned {status}: {body}"
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| SkycastError::Upstream(format!("Invalid Open-Meteo response: {e}")))?;

        let series = parse_hourly(body.hourly)?;
        tracing::debug!(
            "🌦 Open-Meteo ({latitude}, {longitude}): {} hourly records",
            series.hourly.len()
        );
        Ok(series)
    }
}

fn parse_hourly(block: HourlyBlock) -> Result<ForecastSeries> {
    let n = block.time.len();
    // A missing precipitation array reads as all-null; a present one must line up.
    let precip_len = block.precipitation_probability.len();
    if block.temperature_2m.len() != n
        || block.weathercode.len() != n
        || (precip_len != 0 && precip_len != n)
    {
        return Err(SkycastError::Upstream(format!(
            "Hourly arrays differ in length: time={n}, temperature_2m={}, weathercode={}, precipitation_probability={precip_len}",
            block.temperature_2m.len(),
            block.weathercode.len()
        )));
    }

    let mut hourly = Vec::with_capacity(n);
    for (i, ts) in block.time.iter().enumerate() {
        let time = NaiveDateTime::parse_from_str(ts, TIME_FORMAT)
            .map_err(|e| SkycastError::Upstream(format!("Bad hourly timestamp '{ts}': {e}")))?;

        // Trailing hours sometimes come back null; leave them out.
        let (Some(temperature), Some(code)) = (block.temperature_2m[i], block.weathercode[i]) else {
            tracing::debug!("Skipping {ts}: null temperature or weather code");
            continue;
        };

        hourly.push(HourlyRecord {
            time,
            slot: ForecastSlot {
                temperature,
                weather_code: code as i32,
                precipitation_probability: block.precipitation_probability.get(i).copied().flatten(),
            },
        });
    }
    Ok(ForecastSeries::new(hourly))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenMeteoProvider {
        OpenMeteoProvider::new(
            &format!("{}/v1/forecast", server.uri()),
            "Europe/Moscow",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_hourly_block() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("forecast_days", "2"))
            .and(query_param("timezone", "Europe/Moscow"))
            .and(query_param("hourly", HOURLY_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 54.6,
                "longitude": 43.9,
                "hourly": {
                    "time": ["2026-05-01T08:00", "2026-05-01T09:00", "2026-05-01T10:00"],
                    "temperature_2m": [4.2, 5.0, null],
                    "weathercode": [61, 3, 0],
                    "precipitation_probability": [70, null, 0]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let series = provider(&server).fetch(54.6, 43.9).await.unwrap();
        assert_eq!(series.hourly.len(), 2);
        assert_eq!(series.hourly[0].slot.weather_code, 61);
        assert_eq!(series.hourly[0].slot.precipitation_probability, Some(70.0));
        assert_eq!(series.hourly[1].slot.precipitation_probability, None);
        assert_eq!(series.hourly[1].time.to_string(), "2026-05-01 09:00:00");
    }

    #[tokio::test]
    async fn test_http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, SkycastError::Upstream(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": true})))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, SkycastError::Upstream(_)));
    }

    #[test]
    fn test_mismatched_arrays_rejected() {
        let block = HourlyBlock {
            time: vec!["2026-05-01T08:00".into(), "2026-05-01T09:00".into()],
            temperature_2m: vec![Some(1.0)],
            weathercode: vec![Some(0.0), Some(0.0)],
            precipitation_probability: vec![],
        };
        assert!(parse_hourly(block).is_err());
    }

    #[test]
    fn test_short_precipitation_array_rejected() {
        let block = HourlyBlock {
            time: vec!["2026-05-01T08:00".into(), "2026-05-01T09:00".into()],
            temperature_2m: vec![Some(1.0), Some(2.0)],
            weathercode: vec![Some(0.0), Some(0.0)],
            precipitation_probability: vec![Some(10.0)],
        };
        let err = parse_hourly(block).unwrap_err();
        assert!(matches!(err, SkycastError::Upstream(_)));
        assert!(err.to_string().contains("precipitation_probability=1"));
    }

    #[test]
    fn test_missing_precipitation_array_reads_as_null() {
        let block = HourlyBlock {
            time: vec!["2026-05-01T08:00".into()],
            temperature_2m: vec![Some(1.0)],
            weathercode: vec![Some(0.0)],
            precipitation_probability: vec![],
        };
        let series = parse_hourly(block).unwrap();
        assert_eq!(series.hourly.len(), 1);
        assert_eq!(series.hourly[0].slot.precipitation_probability, None);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let block = HourlyBlock {
            time: vec!["yesterday".into()],
            temperature_2m: vec![Some(1.0)],
            weathercode: vec![Some(0.0)],
            precipitation_probability: vec![Some(0.0)],
        };
        assert!(parse_hourly(block).is_err());
    }
}
