//! Pairwise travel distance sources.
//!
//! The planner only depends on [`DistanceProvider`]; the providers here are
//! an offline great-circle estimate and a BRouter routing service client.

use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::ProviderError;

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub const DEFAULT_BROUTER_URL: &str = "https://brouter.cxberlin.net/brouter";
pub const DEFAULT_BROUTER_PROFILE: &str = "trekking";
const BROUTER_TIMEOUT: Duration = Duration::from_secs(20);

/// Scalar travel distance between two coordinates.
///
/// Implementations must report failures instead of substituting a default
/// distance. Queries may run concurrently from several worker threads.
pub trait DistanceProvider: Send + Sync {
    fn distance(&self, lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<f64, ProviderError>;
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for &P {
    fn distance(&self, lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<f64, ProviderError> {
        (**self).distance(lon1, lat1, lon2, lat2)
    }
}

// =================== GREAT CIRCLE ===================

/// Straight-line distance over the earth's surface, in meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineProvider;

impl DistanceProvider for HaversineProvider {
    fn distance(&self, lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<f64, ProviderError> {
        if ![lon1, lat1, lon2, lat2].iter().all(|c| c.is_finite()) {
            return Err(ProviderError::Malformed(format!(
                "non-finite coordinates {},{} -> {},{}",
                lon1, lat1, lon2, lat2
            )));
        }
        Ok(haversine_distance(lat1, lon1, lat2, lon2))
    }
}

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

// =================== BROUTER ===================

/// Track length reported by a BRouter instance for the given profile.
#[derive(Debug, Clone)]
pub struct BrouterProvider {
    client: Client,
    base_url: String,
    profile: String,
}

impl BrouterProvider {
    pub fn new(base_url: impl Into<String>, profile: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(BROUTER_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            profile: profile.into(),
        })
    }

    pub fn request_url(&self, lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> String {
        format!(
            "{}?lonlats={},{}|{},{}&profile={}&alternativeidx=0&format=geojson",
            self.base_url, lon1, lat1, lon2, lat2, self.profile
        )
    }
}

impl DistanceProvider for BrouterProvider {
    fn distance(&self, lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<f64, ProviderError> {
        let url = self.request_url(lon1, lat1, lon2, lat2);
        debug!("GET {}", url);

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value = response.json()?;
        parse_track_length(&body)
    }
}

/// Pulls `features[0].properties["track-length"]` out of a BRouter GeoJSON answer.
///
/// BRouter encodes the length as a string; plain numbers are accepted too.
pub fn parse_track_length(body: &Value) -> Result<f64, ProviderError> {
    let raw = &body["features"][0]["properties"]["track-length"];
    let length = match raw {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| ProviderError::Malformed(format!("track-length {:?}: {}", s, e)))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ProviderError::Malformed(format!("track-length {}", n)))?,
        Value::Null => {
            return Err(ProviderError::Malformed("missing track-length".to_string()));
        }
        other => {
            return Err(ProviderError::Malformed(format!("track-length {}", other)));
        }
    };

    if !length.is_finite() || length < 0.0 {
        return Err(ProviderError::Malformed(format!("track-length {}", length)));
    }
    Ok(length)
}
