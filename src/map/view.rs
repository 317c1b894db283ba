//! The map view: one session's state, its rendered scene and its subscriptions.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::capture::{self, CaptureDecision, SkipReason};
use super::feed::{self, FeedSubscription, SnapshotSink};
use super::{MarkerLedger, PlaceResolver, RoutePlan, RouteReconciler, SceneSurface};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Endpoint, LatLng, MapScene, PlaceBias, PlaceCandidate, Report, TravelMode};
use crate::services::{
    establish_identity, AuthProvider, BoxFuture, DirectionsService, LocationError,
    LocationProvider, PlaceAutocomplete, ReportStore, Snapshot,
};
use crate::session::SessionState;

/// The collaborators a view talks to.
#[derive(Clone)]
pub struct MapServices {
    pub store: Arc<dyn ReportStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub location: Arc<dyn LocationProvider>,
    pub directions: Arc<dyn DirectionsService>,
    pub places: Arc<dyn PlaceAutocomplete>,
}

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub default_center: LatLng,
    pub place_bias: PlaceBias,
    pub travel_mode: TravelMode,
    pub danger_radius_m: f64,
    pub initial_auth_token: Option<String>,
}

impl ViewSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_center: config.default_center,
            place_bias: config.place_bias.clone(),
            travel_mode: config.travel_mode,
            danger_radius_m: config.danger_radius_m,
            initial_auth_token: config.initial_auth_token.clone(),
        }
    }
}

/// Result of a capture confirmation.
pub struct CaptureReceipt {
    pub skipped: Option<SkipReason>,
    write: Option<JoinHandle<()>>,
}

impl CaptureReceipt {
    pub fn published(&self) -> bool {
        self.write.is_some()
    }

    /// Wait for the background write to settle.
    pub async fn written(self) {
        if let Some(write) = self.write {
            if let Err(e) = write.await {
                tracing::warn!("Report write task ended abnormally: {}", e);
            }
        }
    }
}

struct ViewInner {
    session: SessionState,
    surface: SceneSurface,
    markers: MarkerLedger,
}

impl ViewInner {
    fn redraw(&mut self, radius_m: f64) {
        self.markers
            .redraw(&self.session, &mut self.surface, radius_m);
    }
}

#[derive(Default)]
struct Lifecycle {
    feed: Option<FeedSubscription>,
    location: Option<JoinHandle<()>>,
}

pub struct MapView {
    services: MapServices,
    settings: ViewSettings,
    reconciler: RouteReconciler,
    resolver: PlaceResolver,
    inner: Mutex<ViewInner>,
    lifecycle: Mutex<Lifecycle>,
    weak_self: Weak<MapView>,
}

impl MapView {
    pub fn new(services: MapServices, settings: ViewSettings) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            reconciler: RouteReconciler::new(settings.travel_mode),
            resolver: PlaceResolver::new(services.places.clone(), settings.place_bias.clone()),
            inner: Mutex::new(ViewInner {
                session: SessionState::new(settings.default_center),
                surface: SceneSurface::new(),
                markers: MarkerLedger::new(),
            }),
            lifecycle: Mutex::new(Lifecycle::default()),
            weak_self: weak_self.clone(),
            services,
            settings,
        })
    }

    /// Bring the view up: sign in, request one location fix and start the report feed.
    pub async fn mount(&self) -> Result<(), AppError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.session.mounted {
                return Ok(());
            }
            inner.session.mounted = true;
            inner.redraw(self.settings.danger_radius_m);
        }

        let identity = establish_identity(
            self.services.auth.as_ref(),
            self.settings.initial_auth_token.as_deref(),
        )
        .await;

        let location_allowed = {
            let mut inner = self.inner.lock().await;
            inner.session.identity = identity;
            inner.session.permissions.location
        };

        let sink: Weak<dyn SnapshotSink> = self.weak_self.clone();
        let subscription = match feed::subscribe(self.services.store.as_ref(), sink).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!("Failed to subscribe to reports: {}", e);
                self.inner.lock().await.session.mounted = false;
                return Err(e);
            }
        };

        let location_task = if location_allowed {
            Some(self.request_location())
        } else {
            tracing::info!("Location permission not granted, skipping location request");
            None
        };

        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.location = location_task;
        lifecycle.feed = Some(subscription);

        tracing::info!("Map view mounted");
        Ok(())
    }

    /// Stop the feed and any pending location request. Late callbacks are ignored.
    pub async fn unmount(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if let Some(mut subscription) = lifecycle.feed.take() {
                subscription.cancel();
            }
            if let Some(task) = lifecycle.location.take() {
                task.abort();
            }
        }

        self.inner.lock().await.session.mounted = false;
        tracing::info!("Map view unmounted");
    }

    fn request_location(&self) -> JoinHandle<()> {
        let weak = self.weak_self.clone();
        let location = self.services.location.clone();

        tokio::spawn(async move {
            match location.current_position().await {
                Ok(fix) => {
                    if let Some(view) = weak.upgrade() {
                        if let Err(e) = view.on_location_fix(fix).await {
                            tracing::warn!("Location fix not applied: {}", e);
                        }
                    }
                }
                Err(LocationError::PermissionDenied) => {
                    tracing::warn!("Location permission denied, route source stays unset");
                }
                Err(e) => tracing::warn!("Could not get a location fix: {}", e),
            }
        })
    }

    pub async fn session_snapshot(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    pub async fn scene(&self) -> MapScene {
        self.inner.lock().await.surface.scene()
    }

    /// Current reports and the revision they came from.
    pub async fn reports(&self) -> (Vec<Report>, i64) {
        let inner = self.inner.lock().await;
        (inner.session.reports.clone(), inner.session.feed_revision)
    }

    pub async fn revision(&self) -> i64 {
        self.inner.lock().await.session.feed_revision
    }

    /// A device position. Moves every device-tracking endpoint.
    pub async fn on_location_fix(&self, fix: LatLng) -> Result<(), AppError> {
        let plan = {
            let mut guard = self.inner.lock().await;
            if !guard.session.mounted {
                tracing::debug!("Ignoring location fix for an unmounted view");
                return Ok(());
            }
            if !guard.session.permissions.location {
                return Err(AppError::PermissionDenied(
                    "Location permission not granted".to_string(),
                ));
            }

            let inner = &mut *guard;
            inner.session.current_location = Some(fix);
            let plan = self
                .reconciler
                .device_moved(&mut inner.session.route, &mut inner.surface, fix);
            inner.redraw(self.settings.danger_radius_m);
            plan
        };

        if let Some(plan) = plan {
            self.dispatch(plan);
        }
        Ok(())
    }

    pub async fn set_permissions(&self, location: Option<bool>, camera: Option<bool>) {
        let mut inner = self.inner.lock().await;
        let permissions = &mut inner.session.permissions;
        if let Some(location) = location {
            permissions.location = location;
        }
        if let Some(camera) = camera {
            permissions.camera = camera;
        }

        if !inner.session.permissions.camera && inner.session.capture.scanning {
            inner.session.capture.scanning = false;
            tracing::info!("Camera permission withdrawn, scanner closed");
        }
    }

    pub async fn open_capture(&self) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.session.permissions.camera {
            return Err(AppError::PermissionDenied(
                "Camera permission not granted".to_string(),
            ));
        }
        inner.session.capture.scanning = true;
        Ok(())
    }

    pub async fn close_capture(&self) {
        self.inner.lock().await.session.capture.scanning = false;
    }

    /// Confirm a sighting. The success dialog is shown immediately; the write,
    /// if any, runs in the background.
    pub async fn confirm_capture(&self) -> CaptureReceipt {
        let decision = {
            let mut inner = self.inner.lock().await;
            let decision = capture::confirm(&mut inner.session);
            decision
        };

        let report = match decision {
            CaptureDecision::Publish(report) => report,
            CaptureDecision::Skip(reason) => {
                tracing::warn!("Report not published: {}", reason);
                return CaptureReceipt {
                    skipped: Some(reason),
                    write: None,
                };
            }
        };

        let store = self.services.store.clone();
        let weak = self.weak_self.clone();
        let write = tokio::spawn(async move {
            let result = store.create(report).await;

            let Some(view) = weak.upgrade() else {
                return;
            };
            let mut inner = view.inner.lock().await;
            match result {
                Ok(id) => {
                    tracing::info!("Report {} published", id);
                    inner.session.capture.submitted += 1;
                    inner.session.capture.last_error = None;
                }
                Err(e) => {
                    tracing::error!("Failed to publish report: {}", e);
                    inner.session.capture.last_error = Some(e.message());
                }
            }
        });

        CaptureReceipt {
            skipped: None,
            write: Some(write),
        }
    }

    pub async fn dismiss_dialog(&self) {
        self.inner.lock().await.session.capture.success_dialog = false;
    }

    pub async fn suggest_places(&self, input: &str) -> Result<Vec<PlaceCandidate>, AppError> {
        self.resolver.suggest(input).await
    }

    /// Edit an endpoint's search text. Endpoints only change on selection.
    pub async fn set_query(&self, endpoint: Endpoint, text: String) {
        self.inner.lock().await.session.route.slot_mut(endpoint).query = text;
    }

    /// Use a selected candidate as an endpoint. Returns false when the
    /// candidate has no location and was ignored.
    pub async fn select_place(
        &self,
        endpoint: Endpoint,
        candidate: &PlaceCandidate,
    ) -> Result<bool, AppError> {
        let Some(point) = self.resolver.resolve(candidate).await? else {
            return Ok(false);
        };

        self.replan(|reconciler, inner| {
            reconciler.select(&mut inner.session.route, &mut inner.surface, endpoint, point)
        })
        .await;
        Ok(true)
    }

    pub async fn use_device_location(&self, endpoint: Endpoint) {
        self.replan(|reconciler, inner| {
            let fix = inner.session.current_location;
            reconciler.use_device(&mut inner.session.route, &mut inner.surface, endpoint, fix)
        })
        .await;
    }

    pub async fn clear_endpoint(&self, endpoint: Endpoint) {
        self.replan(|reconciler, inner| {
            reconciler.clear(&mut inner.session.route, &mut inner.surface, endpoint)
        })
        .await;
    }

    pub async fn swap_endpoints(&self) {
        self.replan(|reconciler, inner| {
            reconciler.swap(&mut inner.session.route, &mut inner.surface)
        })
        .await;
    }

    /// Apply an endpoint change under the lock, redraw, then query if needed.
    async fn replan<F>(&self, change: F)
    where
        F: FnOnce(&RouteReconciler, &mut ViewInner) -> RoutePlan,
    {
        let plan = {
            let mut guard = self.inner.lock().await;
            let plan = change(&self.reconciler, &mut *guard);
            guard.redraw(self.settings.danger_radius_m);
            plan
        };
        self.dispatch(plan);
    }

    fn dispatch(&self, plan: RoutePlan) {
        let RoutePlan::Query(request) = plan else {
            return;
        };

        let weak = self.weak_self.clone();
        let directions = self.services.directions.clone();
        tokio::spawn(async move {
            let result = directions
                .route(&request.origin, &request.destination, request.mode)
                .await;

            let Some(view) = weak.upgrade() else {
                return;
            };
            let mut guard = view.inner.lock().await;
            if !guard.session.mounted {
                return;
            }
            let inner = &mut *guard;
            let outcome =
                RouteReconciler::apply(&mut inner.session.route, &mut inner.surface, &request, result);
            tracing::debug!(
                "Directions for generation {}: {:?}",
                request.generation,
                outcome
            );
        });
    }
}

impl SnapshotSink for MapView {
    fn on_snapshot(&self, snapshot: Snapshot) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if !inner.session.mounted {
                return;
            }
            feed::apply_snapshot(&mut inner.session, &snapshot);
            inner.redraw(self.settings.danger_radius_m);
            tracing::debug!(
                "Applied snapshot revision {} with {} reports",
                snapshot.revision,
                inner.session.reports.len()
            );
        })
    }
}
