#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel time polling for watched street segments.
//!
//! Each poll cycle routes every configured segment in each allowed
//! direction through a [`TravelTimeProvider`], enriches the returned
//! timings with derived flow metrics, and appends the results to the
//! sample store.

pub mod cycle;
pub mod open_meteo;
pub mod retry;
pub mod tomtom;

pub use cycle::{CycleOutcome, run_cycle};
pub use open_meteo::WeatherClient;
pub use tomtom::{RouteTiming, TomTomRouting, TravelTimeProvider};

/// Errors that can occur while polling travel times.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sample store write failed.
    #[error("Store error: {0}")]
    Store(#[from] traffic_map_store::StoreError),

    /// The remote API answered without usable data.
    #[error("API error: {message}")]
    Api {
        /// Description of what went wrong.
        message: String,
    },

    /// Required credentials or settings are missing.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}
