//! # Skycast Weather
//!
//! Turns hourly forecasts into the text report that gets broadcast.
//!
//! - [`open_meteo::OpenMeteoProvider`]: `WeatherProvider` over the Open-Meteo HTTP API
//! - [`assembler::ForecastAssembler`]: per-location fetch + slot extraction + rendering
//! - [`wmo`]: WMO weather code → emoji / description / precipitation label

pub mod assembler;
pub mod open_meteo;
pub mod wmo;

pub use assembler::{ForecastAssembler, SLOT_MARKERS};
pub use open_meteo::OpenMeteoProvider;
