//! Skycast configuration system.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SkycastError};
use crate::types::Location;

/// Environment variable that overrides `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// Upper bound on `[[locations]]`; every location adds a block to each report.
pub const MAX_LOCATIONS: usize = 10;

pub const MAX_LOCATION_NAME_CHARS: usize = 64;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkycastConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,
}

fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Ельники (Мордовия)", 54.62348, 43.87309),
        Location::new("Волхов (Ленинградская область)", 59.9258, 32.33819),
    ]
}

impl Default for SkycastConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            weather: WeatherConfig::default(),
            schedule: ScheduleConfig::default(),
            storage: StorageConfig::default(),
            locations: default_locations(),
        }
    }
}

impl SkycastConfig {
    /// Load config from the default path (~/.skycast/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SkycastError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SkycastError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Skycast home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".skycast")
    }

    /// Bot token, preferring the `BOT_TOKEN` environment variable.
    pub fn bot_token(&self) -> Result<String> {
        self.bot_token_with(std::env::var(BOT_TOKEN_ENV).ok())
    }

    fn bot_token_with(&self, env_token: Option<String>) -> Result<String> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.telegram.bot_token.clone()).filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| {
                SkycastError::Config(format!(
                    "Telegram bot token missing: set {BOT_TOKEN_ENV} or telegram.bot_token"
                ))
            })
    }

    /// Check everything that would otherwise fail late, at first use.
    pub fn validate(&self) -> Result<()> {
        self.schedule.timezone()?;
        self.schedule.today_at()?;
        self.schedule.tomorrow_at()?;
        self.storage.chats_path()?;
        if self.locations.is_empty() {
            return Err(SkycastError::Config("At least one location is required".into()));
        }
        // Keeps a full report under Telegram's 4096-character message limit.
        if self.locations.len() > MAX_LOCATIONS {
            return Err(SkycastError::Config(format!(
                "Too many locations: {} (at most {MAX_LOCATIONS})",
                self.locations.len()
            )));
        }
        for loc in &self.locations {
            if loc.name.chars().count() > MAX_LOCATION_NAME_CHARS {
                return Err(SkycastError::Config(format!(
                    "Location name '{}' is longer than {MAX_LOCATION_NAME_CHARS} characters",
                    loc.name
                )));
            }
            if !(-90.0..=90.0).contains(&loc.latitude) || !(-180.0..=180.0).contains(&loc.longitude)
            {
                return Err(SkycastError::Config(format!(
                    "Location '{}' has out-of-range coordinates ({}, {})",
                    loc.name, loc.latitude, loc.longitude
                )));
            }
        }
        Ok(())
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_api_base() -> String { "https://api.telegram.org".into() }
fn default_poll_interval() -> u64 { 1 }
fn default_send_timeout() -> u64 { 10 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            poll_interval: default_poll_interval(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Weather provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

fn default_weather_url() -> String { "https://api.open-meteo.com/v1/forecast".into() }
fn default_weather_timeout() -> u64 { 20 }

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            timeout_secs: default_weather_timeout(),
        }
    }
}

/// Daily broadcast times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA zone name. All wall-clock times below are read in this zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_today_at")]
    pub today_at: String,
    #[serde(default = "default_tomorrow_at")]
    pub tomorrow_at: String,
}

fn default_timezone() -> String { "Europe/Moscow".into() }
fn default_today_at() -> String { "06:00".into() }
fn default_tomorrow_at() -> String { "19:00".into() }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            today_at: default_today_at(),
            tomorrow_at: default_tomorrow_at(),
        }
    }
}

impl ScheduleConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| SkycastError::Config(format!("Invalid timezone '{}': {e}", self.timezone)))
    }

    pub fn today_at(&self) -> Result<NaiveTime> {
        parse_time_of_day(&self.today_at)
    }

    pub fn tomorrow_at(&self) -> Result<NaiveTime> {
        parse_time_of_day(&self.tomorrow_at)
    }
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| SkycastError::Config(format!("Invalid time of day '{s}' (expected HH:MM): {e}")))
}

/// Where the recipient registry lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_chats_file")]
    pub chats_file: String,
}

fn default_chats_file() -> String { "~/.skycast/chats.json".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { chats_file: default_chats_file() }
    }
}

impl StorageConfig {
    /// Registry path with `~` and `$VAR` / `${VAR}` expanded.
    pub fn chats_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.chats_file).map_err(|e| {
            SkycastError::Config(format!("Invalid storage.chats_file '{}': {e}", self.chats_file))
        })?;
        Ok(PathBuf::from(expanded.into_owned()))
    }
}
