//! Forecast Assembler: fetches every configured location and renders one report.
//!
//! A report is all-or-nothing: if any location fails to fetch (or times out)
//! the whole build fails. A missing hour inside a fetched series is not a
//! failure; it renders as a "no data" line.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use skycast_core::error::{Result, SkycastError};
use skycast_core::traits::WeatherProvider;
use skycast_core::types::{DayOffset, ForecastSeries, ForecastSlot, Location};

use crate::wmo;

/// Hours sampled for each location, in report order, with their row labels.
pub const SLOT_MARKERS: [(&str, u32); 3] = [("Утро:  ", 8), ("День:  ", 14), ("Вечер: ", 20)];

pub struct ForecastAssembler {
    provider: Arc<dyn WeatherProvider>,
    locations: Vec<Location>,
    fetch_timeout: Duration,
}

impl ForecastAssembler {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        locations: Vec<Location>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            locations,
            fetch_timeout,
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Build the full report text for `day`.
    pub async fn build_report(&self, day: DayOffset) -> Result<String> {
        let mut blocks = vec![title(day).to_string()];

        for location in &self.locations {
            let series = self.fetch(location).await?;
            let slots = select_slots(&series, day)?;
            blocks.push(render_location(&location.name, &slots));
        }

        tracing::info!(
            "📝 Built {} report for {} location(s)",
            day.label(),
            self.locations.len()
        );
        Ok(blocks.join("\n").trim().to_string())
    }

    async fn fetch(&self, location: &Location) -> Result<ForecastSeries> {
        tracing::debug!(
            "🌍 Fetching '{}' ({}, {}) via {}",
            location.name,
            location.latitude,
            location.longitude,
            self.provider.name()
        );
        let fetch = self.provider.fetch(location.latitude, location.longitude);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(series)) => Ok(series),
            Ok(Err(e)) => {
                tracing::warn!("⚠️ Forecast fetch failed for '{}': {e}", location.name);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ Forecast fetch for '{}' timed out after {:?}",
                    location.name,
                    self.fetch_timeout
                );
                Err(SkycastError::Upstream(format!(
                    "Fetch for '{}' timed out after {}s",
                    location.name,
                    self.fetch_timeout.as_secs_f32()
                )))
            }
        }
    }
}

fn title(day: DayOffset) -> &'static str {
    match day {
        DayOffset::Today => "🌤 Прогноз на сегодня\n",
        DayOffset::Tomorrow => "🌙 Прогноз на завтра\n",
    }
}

/// Calendar date a report for `day` should describe.
///
/// Takes the first two distinct dates of the series. Tomorrow falls back to
/// the first date when the provider returned only one day.
pub fn target_date(series: &ForecastSeries, day: DayOffset) -> Option<NaiveDate> {
    let dates = series.leading_dates();
    match day {
        DayOffset::Today => dates.first().copied(),
        DayOffset::Tomorrow => dates.get(1).or(dates.first()).copied(),
    }
}

/// Morning / day / evening slots for the target date; `None` where the exact
/// hour is missing.
pub fn select_slots(series: &ForecastSeries, day: DayOffset) -> Result<[Option<ForecastSlot>; 3]> {
    let date = target_date(series, day)
        .ok_or_else(|| SkycastError::Upstream("Forecast contains no hourly data".into()))?;

    Ok(SLOT_MARKERS.map(|(_, hour)| {
        NaiveTime::from_hms_opt(hour, 0, 0)
            .and_then(|t| series.at(date.and_time(t)))
            .cloned()
    }))
}

fn render_location(name: &str, slots: &[Option<ForecastSlot>; 3]) -> String {
    let mut block = format!("📍 {name}\n");
    for ((label, _), slot) in SLOT_MARKERS.iter().zip(slots) {
        let line = slot
            .as_ref()
            .map(wmo::render_slot)
            .unwrap_or_else(|| wmo::NO_DATA.to_string());
        block.push_str(&format!("• {label} {line}\n"));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use skycast_core::types::HourlyRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(ts: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap()
    }

    fn record(ts: &str, temperature: f64, code: i32, pop: f64) -> HourlyRecord {
        HourlyRecord {
            time: at(ts),
            slot: ForecastSlot {
                temperature,
                weather_code: code,
                precipitation_probability: Some(pop),
            },
        }
    }

    /// Two days, every hour, clear sky, temperature = hour of day.
    fn two_day_series() -> ForecastSeries {
        let mut hourly = Vec::new();
        for date in ["2026-05-01", "2026-05-02"] {
            for hour in 0..24 {
                let offset = if date.ends_with("02") { 100.0 } else { 0.0 };
                hourly.push(record(
                    &format!("{date}T{hour:02}:00"),
                    hour as f64 + offset,
                    0,
                    0.0,
                ));
            }
        }
        ForecastSeries::new(hourly)
    }

    struct FixedProvider {
        series: ForecastSeries,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn fetch(&self, _lat: f64, _lon: f64) -> Result<ForecastSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.series.clone())
        }
    }

    /// Fails for one latitude, answers the rest.
    struct FlakyProvider {
        series: ForecastSeries,
        fail_lat: f64,
    }

    #[async_trait]
    impl WeatherProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn fetch(&self, lat: f64, _lon: f64) -> Result<ForecastSeries> {
            if lat == self.fail_lat {
                return Err(SkycastError::Upstream("HTTP 502".into()));
            }
            Ok(self.series.clone())
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl WeatherProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn fetch(&self, _lat: f64, _lon: f64) -> Result<ForecastSeries> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ForecastSeries::default())
        }
    }

    fn assembler(provider: Arc<dyn WeatherProvider>, locations: Vec<Location>) -> ForecastAssembler {
        ForecastAssembler::new(provider, locations, Duration::from_secs(5))
    }

    #[test]
    fn test_target_date_today_and_tomorrow() {
        let series = two_day_series();
        assert_eq!(target_date(&series, DayOffset::Today).unwrap().to_string(), "2026-05-01");
        assert_eq!(target_date(&series, DayOffset::Tomorrow).unwrap().to_string(), "2026-05-02");
    }

    #[test]
    fn test_tomorrow_falls_back_to_single_date() {
        let series = ForecastSeries::new(vec![
            record("2026-05-01T08:00", 5.0, 0, 0.0),
            record("2026-05-01T14:00", 9.0, 0, 0.0),
            record("2026-05-01T20:00", 6.0, 0, 0.0),
        ]);
        let today = select_slots(&series, DayOffset::Today).unwrap();
        let tomorrow = select_slots(&series, DayOffset::Tomorrow).unwrap();
        assert_eq!(today, tomorrow);
        assert_eq!(tomorrow[1].as_ref().unwrap().temperature, 9.0);
    }

    #[test]
    fn test_select_slots_picks_target_day_hours() {
        let series = two_day_series();
        let slots = select_slots(&series, DayOffset::Tomorrow).unwrap();
        let temps: Vec<f64> = slots.iter().map(|s| s.as_ref().unwrap().temperature).collect();
        assert_eq!(temps, vec![108.0, 114.0, 120.0]);
    }

    #[test]
    fn test_empty_series_is_upstream_error() {
        let err = select_slots(&ForecastSeries::default(), DayOffset::Today).unwrap_err();
        assert!(matches!(err, SkycastError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_missing_slot_renders_placeholder() {
        let series = ForecastSeries::new(vec![
            record("2026-05-01T08:00", 5.0, 0, 0.0),
            record("2026-05-01T15:00", 9.0, 0, 0.0),
            record("2026-05-01T20:00", 6.0, 0, 0.0),
        ]);
        let provider = Arc::new(FixedProvider { series, calls: AtomicUsize::new(0) });
        let report = assembler(provider, vec![Location::new("L1", 0.0, 0.0)])
            .build_report(DayOffset::Today)
            .await
            .unwrap();

        let lines: Vec<&str> = report.lines().collect();
        assert!(lines.iter().any(|l| l.starts_with("• Утро:") && l.contains("5°C")));
        assert!(lines.iter().any(|l| l.starts_with("• День:") && l.ends_with(wmo::NO_DATA)));
        assert!(lines.iter().any(|l| l.starts_with("• Вечер:") && l.contains("6°C")));
    }

    #[tokio::test]
    async fn test_end_to_end_clear_today_report() {
        let provider = Arc::new(FixedProvider {
            series: two_day_series(),
            calls: AtomicUsize::new(0),
        });
        let report = assembler(provider.clone(), vec![Location::new("L1", 0.0, 0.0)])
            .build_report(DayOffset::Today)
            .await
            .unwrap();

        assert_eq!(
            report,
            "🌤 Прогноз на сегодня\n\n\
             📍 L1\n\
             • Утро:   ☀️ 8°C, Ясно\n\
             • День:   ☀️ 14°C, Ясно\n\
             • Вечер:  ☀️ 20°C, Ясно"
        );
        assert!(!report.contains('%'));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_locations_keep_configured_order() {
        let provider = Arc::new(FixedProvider {
            series: two_day_series(),
            calls: AtomicUsize::new(0),
        });
        let report = assembler(
            provider.clone(),
            vec![Location::new("Beta", 1.0, 1.0), Location::new("Alpha", 2.0, 2.0)],
        )
        .build_report(DayOffset::Tomorrow)
        .await
        .unwrap();

        assert!(report.starts_with("🌙 Прогноз на завтра"));
        let beta = report.find("📍 Beta").unwrap();
        let alpha = report.find("📍 Alpha").unwrap();
        assert!(beta < alpha);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_one_failed_location_fails_whole_report() {
        let provider = Arc::new(FlakyProvider {
            series: two_day_series(),
            fail_lat: 2.0,
        });
        let result = assembler(
            provider,
            vec![Location::new("ok", 1.0, 1.0), Location::new("broken", 2.0, 2.0)],
        )
        .build_report(DayOffset::Today)
        .await;
        assert!(matches!(result, Err(SkycastError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_hung_fetch_times_out() {
        let assembler = ForecastAssembler::new(
            Arc::new(HangingProvider),
            vec![Location::new("slow", 0.0, 0.0)],
            Duration::from_millis(50),
        );
        let err = assembler.build_report(DayOffset::Today).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
