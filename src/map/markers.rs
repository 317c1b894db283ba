//! Report and endpoint markers.

use super::MapSurface;
use crate::models::{Circle, Marker, MarkerKind, OverlayId};
use crate::session::SessionState;

pub const REPORT_MARKER_TITLE: &str = "MAMA SPOTTED";

/// Overlays placed by the previous redraw.
#[derive(Debug, Default)]
pub struct MarkerLedger {
    markers: Vec<OverlayId>,
    circles: Vec<OverlayId>,
}

impl MarkerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove everything the last redraw placed, then draw the current
    /// reports and endpoints.
    ///
    /// Endpoint markers appear only when both endpoints are set. Without a
    /// destination the camera rests on the device (or the default centre).
    pub fn redraw(&mut self, session: &SessionState, surface: &mut dyn MapSurface, radius_m: f64) {
        for id in self.markers.drain(..) {
            surface.remove_marker(id);
        }
        for id in self.circles.drain(..) {
            surface.remove_circle(id);
        }

        for report in &session.reports {
            let position = report.position();
            self.markers.push(surface.add_marker(Marker {
                kind: MarkerKind::Report,
                position,
                title: Some(REPORT_MARKER_TITLE.to_string()),
                snippet: Some(format!("Verified: {}", report.verified_count)),
            }));
            self.circles.push(surface.add_circle(Circle {
                center: position,
                radius_m,
            }));
        }

        if let Some((source, destination)) = session.route.endpoints() {
            for (kind, point) in [
                (MarkerKind::RouteSource, source),
                (MarkerKind::RouteDestination, destination),
            ] {
                self.markers.push(surface.add_marker(Marker {
                    kind,
                    position: point.position,
                    title: point.name.clone(),
                    snippet: None,
                }));
            }
        }

        if session.route.destination.point.is_none() {
            surface.pan_to(session.resting_center());
        }
    }
}
