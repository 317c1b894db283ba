//! Route overlay reconciliation.
//!
//! Every endpoint change bumps the route generation. With both endpoints set
//! a directions request tagged with that generation is planned; otherwise
//! the polyline and summary are cleared. Results are applied only while
//! their generation and endpoints still match.

use super::MapSurface;
use crate::errors::AppError;
use crate::models::{DirectionsResult, Endpoint, LatLng, RoutePoint, TravelMode};
use crate::session::RouteState;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub generation: u64,
    pub origin: RoutePoint,
    pub destination: RoutePoint,
    pub mode: TravelMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutePlan {
    /// Ask the directions service for this route
    Query(RouteRequest),
    /// An endpoint is missing; overlay and summary were cleared
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied,
    /// Endpoints changed while the query was in flight
    Stale,
    /// The service failed; the previous overlay stays
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteReconciler {
    mode: TravelMode,
}

impl RouteReconciler {
    pub fn new(mode: TravelMode) -> Self {
        Self { mode }
    }

    pub fn select(
        &self,
        route: &mut RouteState,
        surface: &mut dyn MapSurface,
        endpoint: Endpoint,
        point: RoutePoint,
    ) -> RoutePlan {
        route.slot_mut(endpoint).select(point);
        self.replan(route, surface)
    }

    /// Make `endpoint` follow the device, starting at `fix` when known.
    pub fn use_device(
        &self,
        route: &mut RouteState,
        surface: &mut dyn MapSurface,
        endpoint: Endpoint,
        fix: Option<LatLng>,
    ) -> RoutePlan {
        route.slot_mut(endpoint).follow_device(fix);
        self.replan(route, surface)
    }

    /// Move every device-tracking endpoint to `fix`. `None` when no endpoint tracks the device.
    pub fn device_moved(
        &self,
        route: &mut RouteState,
        surface: &mut dyn MapSurface,
        fix: LatLng,
    ) -> Option<RoutePlan> {
        let mut moved = false;
        for endpoint in [Endpoint::Source, Endpoint::Destination] {
            let slot = route.slot_mut(endpoint);
            if slot.tracks_device {
                slot.follow_device(Some(fix));
                moved = true;
            }
        }

        moved.then(|| self.replan(route, surface))
    }

    pub fn clear(
        &self,
        route: &mut RouteState,
        surface: &mut dyn MapSurface,
        endpoint: Endpoint,
    ) -> RoutePlan {
        route.slot_mut(endpoint).clear();
        self.replan(route, surface)
    }

    /// Exchange points, labels and device tracking between the two slots.
    pub fn swap(&self, route: &mut RouteState, surface: &mut dyn MapSurface) -> RoutePlan {
        std::mem::swap(&mut route.source, &mut route.destination);
        self.replan(route, surface)
    }

    fn replan(&self, route: &mut RouteState, surface: &mut dyn MapSurface) -> RoutePlan {
        route.generation += 1;

        match route.endpoints() {
            Some((origin, destination)) => RoutePlan::Query(RouteRequest {
                generation: route.generation,
                origin: origin.clone(),
                destination: destination.clone(),
                mode: self.mode,
            }),
            None => {
                route.info = None;
                surface.clear_route();
                RoutePlan::Cleared
            }
        }
    }

    /// Apply a directions result to the route it was requested for.
    pub fn apply(
        route: &mut RouteState,
        surface: &mut dyn MapSurface,
        request: &RouteRequest,
        result: Result<DirectionsResult, AppError>,
    ) -> RouteOutcome {
        let current = request.generation == route.generation
            && route
                .endpoints()
                .map(|(o, d)| *o == request.origin && *d == request.destination)
                .unwrap_or(false);

        if !current {
            tracing::debug!(
                "Discarding directions result for generation {} (now {})",
                request.generation,
                route.generation
            );
            return RouteOutcome::Stale;
        }

        match result {
            Ok(directions) => {
                surface.set_route(directions.path);
                route.info = Some(directions.info);
                RouteOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Directions request failed, keeping previous route: {}", e);
                RouteOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::SceneSurface;
    use crate::models::RouteInfo;

    fn point(lat: f64, lng: f64, name: &str) -> RoutePoint {
        RoutePoint::new(LatLng::new(lat, lng).unwrap(), Some(name.to_string()))
    }

    fn directions(distance: &str) -> DirectionsResult {
        DirectionsResult {
            info: RouteInfo {
                distance: distance.to_string(),
                duration: "5 mins".to_string(),
            },
            path: vec![LatLng::new(1.0, 1.0).unwrap(), LatLng::new(2.0, 2.0).unwrap()],
        }
    }

    fn request(plan: RoutePlan) -> RouteRequest {
        match plan {
            RoutePlan::Query(request) => request,
            RoutePlan::Cleared => panic!("expected a directions query"),
        }
    }

    #[test]
    fn test_query_only_with_both_endpoints() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        let plan = reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(12.97, 77.64, "Indiranagar"),
        );
        assert_eq!(plan, RoutePlan::Cleared);

        let fix = LatLng::new(12.93, 77.62).unwrap();
        let req = request(reconciler.device_moved(&mut route, &mut surface, fix).unwrap());
        assert_eq!(req.origin.position, fix);
        assert_eq!(req.origin.name.as_deref(), Some("Current Location"));
        assert_eq!(req.destination.name.as_deref(), Some("Indiranagar"));
        assert_eq!(req.generation, route.generation);
        assert_eq!(req.mode, TravelMode::Driving);
    }

    #[test]
    fn test_apply_current_result() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        reconciler.select(&mut route, &mut surface, Endpoint::Source, point(1.0, 1.0, "A"));
        let req = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(2.0, 2.0, "B"),
        ));

        let outcome = RouteReconciler::apply(&mut route, &mut surface, &req, Ok(directions("3 km")));
        assert_eq!(outcome, RouteOutcome::Applied);
        assert_eq!(route.info.as_ref().unwrap().distance, "3 km");
        assert_eq!(surface.scene().route.map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_stale_result_discarded() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        reconciler.select(&mut route, &mut surface, Endpoint::Source, point(1.0, 1.0, "A"));
        let first = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(2.0, 2.0, "B"),
        ));
        let second = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(3.0, 3.0, "C"),
        ));

        // Second answer lands first, then the late first answer.
        assert_eq!(
            RouteReconciler::apply(&mut route, &mut surface, &second, Ok(directions("C"))),
            RouteOutcome::Applied
        );
        assert_eq!(
            RouteReconciler::apply(&mut route, &mut surface, &first, Ok(directions("B"))),
            RouteOutcome::Stale
        );
        assert_eq!(route.info.as_ref().unwrap().distance, "C");
    }

    #[test]
    fn test_failure_keeps_previous_overlay() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        reconciler.select(&mut route, &mut surface, Endpoint::Source, point(1.0, 1.0, "A"));
        let req = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(2.0, 2.0, "B"),
        ));
        RouteReconciler::apply(&mut route, &mut surface, &req, Ok(directions("4 km")));

        let req = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(3.0, 3.0, "C"),
        ));
        let outcome = RouteReconciler::apply(
            &mut route,
            &mut surface,
            &req,
            Err(AppError::Upstream("Directions status ZERO_RESULTS".to_string())),
        );
        assert_eq!(outcome, RouteOutcome::Failed);
        assert_eq!(route.info.as_ref().unwrap().distance, "4 km");
        assert!(surface.scene().route.is_some());
    }

    #[test]
    fn test_clear_removes_route() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        reconciler.select(&mut route, &mut surface, Endpoint::Source, point(1.0, 1.0, "A"));
        let req = request(reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(2.0, 2.0, "B"),
        ));

        assert_eq!(
            reconciler.clear(&mut route, &mut surface, Endpoint::Destination),
            RoutePlan::Cleared
        );
        // The in-flight answer arrives after the clear.
        RouteReconciler::apply(&mut route, &mut surface, &req, Ok(directions("1 km")));

        assert!(route.info.is_none());
        assert!(surface.scene().route.is_none());
        assert!(route.destination.point.is_none());
        assert!(route.destination.query.is_empty());
    }

    #[test]
    fn test_swap_is_involutive() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();
        let fix = LatLng::new(12.93, 77.62).unwrap();

        reconciler.device_moved(&mut route, &mut surface, fix);
        reconciler.select(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            point(12.97, 77.64, "Indiranagar"),
        );
        let before = route.clone();

        let req = request(reconciler.swap(&mut route, &mut surface));
        assert_eq!(req.origin.name.as_deref(), Some("Indiranagar"));
        assert_eq!(route.source.query, "Indiranagar");
        assert_eq!(route.destination.query, "Current Location");
        assert!(route.destination.tracks_device);

        reconciler.swap(&mut route, &mut surface);
        assert_eq!(route.source, before.source);
        assert_eq!(route.destination, before.destination);
        assert_eq!(route.generation, before.generation + 2);
    }

    #[test]
    fn test_device_moved_follows_tracking_slot_only() {
        let reconciler = RouteReconciler::new(TravelMode::Driving);
        let mut route = RouteState::default();
        let mut surface = SceneSurface::new();

        reconciler.select(&mut route, &mut surface, Endpoint::Source, point(1.0, 1.0, "A"));
        assert!(reconciler
            .device_moved(&mut route, &mut surface, LatLng::new(5.0, 5.0).unwrap())
            .is_none());
        assert_eq!(route.source.point.as_ref().unwrap().name.as_deref(), Some("A"));

        reconciler.use_device(
            &mut route,
            &mut surface,
            Endpoint::Destination,
            Some(LatLng::new(5.0, 5.0).unwrap()),
        );
        let req = request(
            reconciler
                .device_moved(&mut route, &mut surface, LatLng::new(6.0, 6.0).unwrap())
                .unwrap(),
        );
        assert_eq!(req.destination.position, LatLng::new(6.0, 6.0).unwrap());
    }
}
