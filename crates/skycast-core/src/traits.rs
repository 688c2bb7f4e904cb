//! Collaborator capabilities consumed by the broadcast core.
//!
//! Concrete implementations live in `skycast-weather` (Open-Meteo) and
//! `skycast-channels` (Telegram); tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ForecastSeries, RecipientId};

/// Source of hourly forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Fetch the hourly series for a coordinate.
    /// Fails with `SkycastError::Upstream`.
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastSeries>;
}

/// Outbound delivery of a text message to a single recipient.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Sink name for logs.
    fn name(&self) -> &str;

    /// Deliver `text` to `recipient`.
    /// Any failure (unreachable, blocked, unknown id) is `SkycastError::Delivery`.
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<()>;
}
