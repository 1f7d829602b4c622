//! TomTom routing client.
//!
//! Measures live vs. free-flow travel time between two points through
//! the `calculateRoute` endpoint with `computeTravelTimeFor=all`, which
//! makes the response carry both timings in one call.

use async_trait::async_trait;
use serde::Deserialize;
use traffic_map_geo::LatLon;

use crate::{PollError, retry};

const API_BASE: &str = "https://api.tomtom.com/routing/1/calculateRoute";

/// Timing figures for one routed trip between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTiming {
    /// Routed distance in meters.
    pub distance_meters: Option<f64>,
    /// Travel time with live traffic, in seconds.
    pub duration_seconds: Option<f64>,
    /// Travel time without traffic, in seconds.
    pub static_duration_seconds: Option<f64>,
    /// Delay attributed to traffic, in seconds.
    pub delay_seconds: Option<f64>,
    /// Street names encountered along the route, deduplicated in order.
    pub route_labels: Option<Vec<String>>,
}

/// Trait for services that measure travel time between two points.
///
/// The poll cycle talks to this trait so tests can substitute a
/// scripted provider for the real routing API.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Routes `origin` to `destination` and returns the observed
    /// timings.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] if the request fails or the response
    /// carries no route.
    async fn route(&self, origin: LatLon, destination: LatLon) -> Result<RouteTiming, PollError>;
}

/// TomTom Routing API provider.
pub struct TomTomRouting {
    api_key: String,
    client: reqwest::Client,
}

impl TomTomRouting {
    /// Creates a new provider with an explicit API key.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a provider with the API key from the `TOMTOM_API_KEY`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Config`] if the variable is unset.
    pub fn from_env() -> Result<Self, PollError> {
        let api_key = std::env::var("TOMTOM_API_KEY").map_err(|_| PollError::Config {
            message: "TOMTOM_API_KEY environment variable is not set".to_string(),
        })?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl TravelTimeProvider for TomTomRouting {
    async fn route(&self, origin: LatLon, destination: LatLon) -> Result<RouteTiming, PollError> {
        let url = format!(
            "{API_BASE}/{},{}:{},{}/json",
            origin.lat, origin.lon, destination.lat, destination.lon
        );
        let body = retry::send_json(|| {
            self.client.get(&url).query(&[
                ("key", self.api_key.as_str()),
                ("computeTravelTimeFor", "all"),
                ("traffic", "true"),
                ("instructionsType", "text"),
                ("travelMode", "car"),
            ])
        })
        .await?;
        parse_route_timing(body)
    }
}

/// Raw `calculateRoute` response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<RawRoute>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    #[serde(default)]
    summary: RawSummary,
    #[serde(default)]
    guidance: Option<RawGuidance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    #[serde(default)]
    length_in_meters: Option<f64>,
    #[serde(default)]
    travel_time_in_seconds: Option<f64>,
    #[serde(default)]
    no_traffic_travel_time_in_seconds: Option<f64>,
    #[serde(default)]
    traffic_delay_in_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGuidance {
    #[serde(default)]
    instructions: Vec<RawInstruction>,
}

#[derive(Debug, Deserialize)]
struct RawInstruction {
    #[serde(default)]
    street: Option<String>,
}

/// Extracts the first route's timings from a raw response body.
fn parse_route_timing(body: serde_json::Value) -> Result<RouteTiming, PollError> {
    let response: RouteResponse = serde_json::from_value(body)?;
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| PollError::Api {
            message: "calculateRoute returned no routes".to_string(),
        })?;

    let route_labels = route
        .guidance
        .map(|guidance| {
            let mut labels: Vec<String> = Vec::new();
            for instruction in guidance.instructions {
                if let Some(street) = instruction.street
                    && !street.is_empty()
                    && !labels.contains(&street)
                {
                    labels.push(street);
                }
            }
            labels
        })
        .filter(|labels| !labels.is_empty());

    Ok(RouteTiming {
        distance_meters: route.summary.length_in_meters,
        duration_seconds: route.summary.travel_time_in_seconds,
        static_duration_seconds: route.summary.no_traffic_travel_time_in_seconds,
        delay_seconds: route.summary.traffic_delay_in_seconds,
        route_labels,
    })
}
