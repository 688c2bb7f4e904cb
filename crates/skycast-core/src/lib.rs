//! # Skycast Core
//!
//! Shared vocabulary for the Skycast workspace: domain types, the two
//! collaborator traits the broadcast core depends on, the error type and
//! configuration.
//!
//! ```text
//! WeatherProvider ──fetch──▶ ForecastAssembler ──report──▶ Broadcaster ──send──▶ MessageSink
//!                                                              │
//!                                                              └─prune─▶ RecipientStore
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::SkycastConfig;
pub use error::{Result, SkycastError};
pub use traits::{MessageSink, WeatherProvider};
pub use types::{DayOffset, ForecastSeries, ForecastSlot, HourlyRecord, Location, RecipientId};
