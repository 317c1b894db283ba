//! Map display surface.

use std::collections::BTreeMap;

use crate::models::{Circle, LatLng, MapScene, Marker, OverlayId, PlacedCircle, PlacedMarker};

/// Overlay operations the view issues against a map.
pub trait MapSurface: Send {
    fn add_marker(&mut self, marker: Marker) -> OverlayId;
    fn remove_marker(&mut self, id: OverlayId);
    fn add_circle(&mut self, circle: Circle) -> OverlayId;
    fn remove_circle(&mut self, id: OverlayId);
    /// Replace the route polyline.
    fn set_route(&mut self, path: Vec<LatLng>);
    fn clear_route(&mut self);
    fn pan_to(&mut self, center: LatLng);
}

/// In-memory surface. The UI shell reads it back as a [`MapScene`].
#[derive(Debug, Default)]
pub struct SceneSurface {
    next_id: u64,
    markers: BTreeMap<OverlayId, Marker>,
    circles: BTreeMap<OverlayId, Circle>,
    route: Option<Vec<LatLng>>,
    center: Option<LatLng>,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> OverlayId {
        self.next_id += 1;
        OverlayId(self.next_id)
    }

    pub fn scene(&self) -> MapScene {
        MapScene {
            center: self.center,
            markers: self
                .markers
                .iter()
                .map(|(id, marker)| PlacedMarker {
                    id: *id,
                    marker: marker.clone(),
                })
                .collect(),
            circles: self
                .circles
                .iter()
                .map(|(id, circle)| PlacedCircle {
                    id: *id,
                    circle: circle.clone(),
                })
                .collect(),
            route: self.route.clone(),
        }
    }
}

impl MapSurface for SceneSurface {
    fn add_marker(&mut self, marker: Marker) -> OverlayId {
        let id = self.allocate();
        self.markers.insert(id, marker);
        id
    }

    fn remove_marker(&mut self, id: OverlayId) {
        self.markers.remove(&id);
    }

    fn add_circle(&mut self, circle: Circle) -> OverlayId {
        let id = self.allocate();
        self.circles.insert(id, circle);
        id
    }

    fn remove_circle(&mut self, id: OverlayId) {
        self.circles.remove(&id);
    }

    fn set_route(&mut self, path: Vec<LatLng>) {
        self.route = Some(path);
    }

    fn clear_route(&mut self) {
        self.route = None;
    }

    fn pan_to(&mut self, center: LatLng) {
        self.center = Some(center);
    }
}
