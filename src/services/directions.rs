//! Directions queries: (origin, destination, mode) to a route summary and overview path.

use serde::Deserialize;

use super::{BoxFuture, MAPS_API_BASE};
use crate::errors::AppError;
use crate::models::{DirectionsResult, LatLng, RouteInfo, RoutePoint, TravelMode};

pub trait DirectionsService: Send + Sync {
    /// Resolve a route. Any non-OK answer is an error; callers leave their
    /// current overlay alone in that case.
    fn route<'a>(
        &'a self,
        origin: &'a RoutePoint,
        destination: &'a RoutePoint,
        mode: TravelMode,
    ) -> BoxFuture<'a, Result<DirectionsResult, AppError>>;
}

/// Maps Directions web service client.
pub struct GoogleDirections {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleDirections {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

impl DirectionsService for GoogleDirections {
    fn route<'a>(
        &'a self,
        origin: &'a RoutePoint,
        destination: &'a RoutePoint,
        mode: TravelMode,
    ) -> BoxFuture<'a, Result<DirectionsResult, AppError>> {
        Box::pin(async move {
            let body = self
                .http
                .get(format!("{}/directions/json", MAPS_API_BASE))
                .query(&[
                    ("origin", origin.position.to_query_value()),
                    ("destination", destination.position.to_query_value()),
                    ("mode", mode.as_str().to_string()),
                    ("key", self.api_key.clone()),
                ])
                .send()
                .await?
                .text()
                .await?;

            parse_directions(&body)
        })
    }
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<ApiRoute>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct ApiRoute {
    #[serde(default)]
    legs: Vec<ApiLeg>,
    #[serde(default)]
    overview_polyline: Option<ApiPolyline>,
}

#[derive(Deserialize)]
struct ApiLeg {
    distance: TextValue,
    duration: TextValue,
}

#[derive(Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Deserialize)]
struct ApiPolyline {
    points: String,
}

/// Parse a directions response body, taking the first leg of the first route.
pub fn parse_directions(body: &str) -> Result<DirectionsResult, AppError> {
    let resp: DirectionsResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("Unreadable directions response: {}", e)))?;

    if resp.status != "OK" {
        return Err(AppError::Upstream(format!(
            "Directions status {}{}",
            resp.status,
            resp.error_message
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        )));
    }

    let route = resp
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream("Directions returned no routes".to_string()))?;
    let leg = route
        .legs
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream("Directions route has no legs".to_string()))?;

    let path = match route.overview_polyline {
        Some(polyline) => decode_polyline(&polyline.points)?,
        None => Vec::new(),
    };

    Ok(DirectionsResult {
        info: RouteInfo {
            distance: leg.distance.text,
            duration: leg.duration.text,
        },
        path,
    })
}

/// Decode an encoded polyline (precision 1e5).
pub fn decode_polyline(encoded: &str) -> Result<Vec<LatLng>, AppError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lng) = (0i64, 0i64);
    let mut path = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_delta(bytes, &mut index)?)?;
        lng = accumulate(lng, next_delta(bytes, &mut index)?)?;
        path.push(LatLng {
            lat: lat as f64 / 1e5,
            lng: lng as f64 / 1e5,
        });
    }

    Ok(path)
}

fn accumulate(value: i64, delta: i64) -> Result<i64, AppError> {
    value
        .checked_add(delta)
        .ok_or_else(|| AppError::Upstream("Malformed polyline".to_string()))
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, AppError> {
    let mut result = 0i64;
    let mut shift = 0;

    loop {
        let byte = bytes
            .get(*index)
            .map(|b| i64::from(*b) - 63)
            .ok_or_else(|| AppError::Upstream("Truncated polyline".to_string()))?;
        if !(0..64).contains(&byte) || shift > 60 {
            return Err(AppError::Upstream("Malformed polyline".to_string()));
        }
        *index += 1;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Offline directions: a straight segment with a mode-dependent average speed.
#[derive(Debug, Default, Clone)]
pub struct StraightLineDirections;

impl StraightLineDirections {
    fn speed_kmh(mode: TravelMode) -> f64 {
        match mode {
            TravelMode::Driving => 25.0,
            TravelMode::Walking => 5.0,
            TravelMode::Bicycling => 15.0,
            TravelMode::Transit => 20.0,
        }
    }
}

impl DirectionsService for StraightLineDirections {
    fn route<'a>(
        &'a self,
        origin: &'a RoutePoint,
        destination: &'a RoutePoint,
        mode: TravelMode,
    ) -> BoxFuture<'a, Result<DirectionsResult, AppError>> {
        Box::pin(async move {
            let meters = origin.position.distance_m(&destination.position);
            let seconds = meters / (Self::speed_kmh(mode) * 1000.0 / 3600.0);

            Ok(DirectionsResult {
                info: RouteInfo {
                    distance: format_distance(meters),
                    duration: format_duration(seconds),
                },
                path: vec![origin.position, destination.position],
            })
        })
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

pub fn format_duration(seconds: f64) -> String {
    let minutes = ((seconds / 60.0).ceil() as i64).max(1);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("{} {}", n, unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    match (hours, minutes) {
        (0, m) => plural(m, "min"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "min")),
    }
}
