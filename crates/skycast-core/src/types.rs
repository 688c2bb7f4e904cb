//! Domain types shared across crates.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A delivery destination. For Telegram this is the chat id.
pub type RecipientId = i64;

/// A named point on the map the report covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Weather at one location for one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    /// Air temperature, °C.
    pub temperature: f64,
    /// WMO weather interpretation code.
    pub weather_code: i32,
    /// Percent, 0..=100. `None` when the provider has no estimate.
    pub precipitation_probability: Option<f64>,
}

/// One hourly entry of a forecast. `time` is local to the configured zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub time: NaiveDateTime,
    pub slot: ForecastSlot,
}

/// Ordered hourly forecast for a single location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub hourly: Vec<HourlyRecord>,
}

impl ForecastSeries {
    pub fn new(hourly: Vec<HourlyRecord>) -> Self {
        Self { hourly }
    }

    pub fn is_empty(&self) -> bool {
        self.hourly.is_empty()
    }

    /// First two distinct calendar dates, in order of appearance.
    pub fn leading_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::with_capacity(2);
        for record in &self.hourly {
            let date = record.time.date();
            if dates.last() != Some(&date) {
                dates.push(date);
                if dates.len() >= 2 {
                    break;
                }
            }
        }
        dates
    }

    /// Slot at exactly `time`, if the provider returned one.
    pub fn at(&self, time: NaiveDateTime) -> Option<&ForecastSlot> {
        self.hourly
            .iter()
            .find(|r| r.time == time)
            .map(|r| &r.slot)
    }
}

/// Which calendar day a report targets, relative to "now" in the fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOffset {
    Today,
    Tomorrow,
}

impl DayOffset {
    pub fn index(self) -> usize {
        match self {
            Self::Today => 0,
            Self::Tomorrow => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }
}
