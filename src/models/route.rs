//! Routing models: endpoints, travel modes and directions results.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::LatLng;
use crate::errors::AppError;

/// Label shown for an endpoint that follows the device position.
pub const CURRENT_LOCATION_LABEL: &str = "Current Location";

/// One of the two route endpoint slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Source,
    Destination,
}

/// A routing endpoint: the device position or a selected place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    #[serde(flatten)]
    pub position: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RoutePoint {
    pub fn new(position: LatLng, name: Option<String>) -> Self {
        Self { position, name }
    }
}

/// Distance/duration summary of the current route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance: String,
    pub duration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

impl FromStr for TravelMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            "transit" => Ok(TravelMode::Transit),
            other => Err(AppError::Validation(format!("Unknown travel mode '{}'", other))),
        }
    }
}

/// A successful directions answer: summary of the first leg plus the overview path.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsResult {
    pub info: RouteInfo,
    pub path: Vec<LatLng>,
}
