//! Per-session state held by the map view.

use serde::Serialize;

use crate::models::{
    Endpoint, LatLng, Report, RouteInfo, RoutePoint, UserId, CURRENT_LOCATION_LABEL,
};

/// Device permissions as last reported by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub location: bool,
    pub camera: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            location: true,
            camera: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureState {
    /// Scanning UI visible
    pub scanning: bool,
    /// "Mama reported" confirmation visible
    pub success_dialog: bool,
    /// Reports written by this session
    pub submitted: u64,
    /// Last failed write, if any
    pub last_error: Option<String>,
}

/// One route endpoint slot: the resolved point, the text shown in its search
/// box and whether it follows the device position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSlot {
    pub point: Option<RoutePoint>,
    pub query: String,
    pub tracks_device: bool,
}

impl EndpointSlot {
    fn device() -> Self {
        Self {
            point: None,
            query: CURRENT_LOCATION_LABEL.to_string(),
            tracks_device: true,
        }
    }

    /// Follow the device, taking `fix` as the point when one is known.
    pub fn follow_device(&mut self, fix: Option<LatLng>) {
        self.tracks_device = true;
        self.query = CURRENT_LOCATION_LABEL.to_string();
        self.point = fix.map(|at| RoutePoint::new(at, Some(CURRENT_LOCATION_LABEL.to_string())));
    }

    pub fn select(&mut self, point: RoutePoint) {
        self.tracks_device = false;
        if let Some(name) = &point.name {
            self.query = name.clone();
        }
        self.point = Some(point);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteState {
    pub source: EndpointSlot,
    pub destination: EndpointSlot,
    /// Summary of the route currently drawn
    pub info: Option<RouteInfo>,
    /// Bumped on every endpoint change; tags outstanding directions queries
    pub generation: u64,
}

impl Default for RouteState {
    fn default() -> Self {
        Self {
            source: EndpointSlot::device(),
            destination: EndpointSlot::default(),
            info: None,
            generation: 0,
        }
    }
}

impl RouteState {
    pub fn slot_mut(&mut self, endpoint: Endpoint) -> &mut EndpointSlot {
        match endpoint {
            Endpoint::Source => &mut self.source,
            Endpoint::Destination => &mut self.destination,
        }
    }

    /// Both points, when both are set.
    pub fn endpoints(&self) -> Option<(&RoutePoint, &RoutePoint)> {
        Some((self.source.point.as_ref()?, self.destination.point.as_ref()?))
    }
}

/// Everything one map session knows. Serialized as-is for `/api/state`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub identity: Option<UserId>,
    pub current_location: Option<LatLng>,
    pub default_center: LatLng,
    pub permissions: Permissions,
    pub reports: Vec<Report>,
    /// Revision of the last applied snapshot
    pub feed_revision: i64,
    pub route: RouteState,
    pub capture: CaptureState,
    pub mounted: bool,
}

impl SessionState {
    pub fn new(default_center: LatLng) -> Self {
        Self {
            identity: None,
            current_location: None,
            default_center,
            permissions: Permissions::default(),
            reports: Vec::new(),
            feed_revision: 0,
            route: RouteState::default(),
            capture: CaptureState::default(),
            mounted: false,
        }
    }

    /// Where the camera rests while no destination is set.
    pub fn resting_center(&self) -> LatLng {
        self.current_location.unwrap_or(self.default_center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = SessionState::new(LatLng::new(12.9716, 77.5946).unwrap());
        assert_eq!(state.route.source.query, CURRENT_LOCATION_LABEL);
        assert!(state.route.source.tracks_device);
        assert!(state.route.source.point.is_none());
        assert!(!state.route.destination.tracks_device);
        assert!(state.permissions.location && state.permissions.camera);
        assert_eq!(state.resting_center(), state.default_center);
    }

    #[test]
    fn test_slot_transitions() {
        let fix = LatLng::new(12.9, 77.6).unwrap();
        let mut slot = EndpointSlot::default();

        slot.follow_device(Some(fix));
        assert_eq!(slot.point.as_ref().unwrap().position, fix);
        assert_eq!(slot.query, CURRENT_LOCATION_LABEL);

        slot.select(RoutePoint::new(fix, Some("Koramangala".to_string())));
        assert!(!slot.tracks_device);
        assert_eq!(slot.query, "Koramangala");

        slot.clear();
        assert_eq!(slot, EndpointSlot::default());
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = SessionState::new(LatLng::new(0.0, 0.0).unwrap());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["route"]["source"]["query"], CURRENT_LOCATION_LABEL);
        assert_eq!(json["route"]["source"]["tracksDevice"], true);
        assert_eq!(json["capture"]["successDialog"], false);
        assert_eq!(json["feedRevision"], 0);
    }
}
