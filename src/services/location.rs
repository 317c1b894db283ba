//! One-shot device geolocation.

use super::BoxFuture;
use crate::models::LatLng;

#[derive(Debug, Clone, PartialEq)]
pub enum LocationError {
    /// The user denied the location permission.
    PermissionDenied,
    /// No fix could be obtained.
    Unavailable(String),
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationError::PermissionDenied => f.write_str("location permission denied"),
            LocationError::Unavailable(reason) => write!(f, "location unavailable: {}", reason),
        }
    }
}

impl std::error::Error for LocationError {}

pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, Result<LatLng, LocationError>>;
}

/// A device whose position is known up front, or whose permission is denied.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    fix: Option<LatLng>,
}

impl StaticLocation {
    pub fn new(fix: Option<LatLng>) -> Self {
        Self { fix }
    }
}

impl LocationProvider for StaticLocation {
    fn current_position(&self) -> BoxFuture<'_, Result<LatLng, LocationError>> {
        let fix = self.fix;
        Box::pin(async move { fix.ok_or(LocationError::PermissionDenied) })
    }
}
