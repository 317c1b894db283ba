//! Test doubles for the external collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::errors::AppError;
use crate::map::MapView;
use crate::models::{
    DirectionsResult, LatLng, NewReport, PlaceBias, PlaceCandidate, ReportDocument, RouteInfo,
    RoutePoint, TravelMode, UserId,
};
use crate::services::{
    AuthProvider, BoxFuture, DirectionsService, PlaceAutocomplete, ReportStore, Snapshot,
};
use crate::session::SessionState;

/// In-memory store that records every create and republishes on demand.
pub struct RecordingStore {
    created: Mutex<Vec<NewReport>>,
    documents: Mutex<Vec<ReportDocument>>,
    revision: AtomicU64,
    fail_writes: AtomicBool,
    fail_watch: AtomicBool,
    sender: watch::Sender<Snapshot>,
}

impl RecordingStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Snapshot::default());
        Self {
            created: Mutex::new(Vec::new()),
            documents: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
            fail_watch: AtomicBool::new(false),
            sender,
        }
    }

    pub fn created(&self) -> Vec<NewReport> {
        self.created.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_watch(&self, fail: bool) {
        self.fail_watch.store(fail, Ordering::SeqCst);
    }

    /// Replace the collection and publish it as the next revision.
    pub fn publish(&self, documents: Vec<ReportDocument>) {
        *self.documents.lock().unwrap() = documents.clone();
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.sender.send_replace(Snapshot {
            revision,
            documents: Arc::new(documents),
        });
    }
}

impl ReportStore for RecordingStore {
    fn create(&self, report: NewReport) -> BoxFuture<'_, Result<String, AppError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("store unavailable".to_string()));
            }

            let id = format!("r{}", self.created.lock().unwrap().len() + 1);
            self.created.lock().unwrap().push(report.clone());

            let mut documents = self.documents.lock().unwrap().clone();
            documents.push(ReportDocument {
                id: id.clone(),
                fields: report.into_fields(),
            });
            self.publish(documents);
            Ok(id)
        })
    }

    fn watch(&self) -> BoxFuture<'_, Result<watch::Receiver<Snapshot>, AppError>> {
        Box::pin(async move {
            if self.fail_watch.load(Ordering::SeqCst) {
                return Err(AppError::Database("store unavailable".to_string()));
            }
            Ok(self.sender.subscribe())
        })
    }
}

/// Auth provider that is always offline.
pub struct FailingAuth;

impl AuthProvider for FailingAuth {
    fn sign_in_anonymously(&self) -> BoxFuture<'_, Result<UserId, AppError>> {
        Box::pin(async { Err(AppError::Upstream("auth offline".to_string())) })
    }

    fn sign_in_with_custom_token<'a>(
        &'a self,
        _token: &'a str,
    ) -> BoxFuture<'a, Result<UserId, AppError>> {
        Box::pin(async { Err(AppError::Unauthorized("token rejected".to_string())) })
    }
}

/// Directions whose summary names the destination (`"to <name>"`), with
/// optional per-destination delays and failures.
#[derive(Default)]
pub struct ScriptedDirections {
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
}

impl ScriptedDirections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(mut self, destination: &str, delay: Duration) -> Self {
        self.delays.insert(destination.to_string(), delay);
        self
    }

    pub fn failing(mut self, destination: &str) -> Self {
        self.failing.push(destination.to_string());
        self
    }
}

impl DirectionsService for ScriptedDirections {
    fn route<'a>(
        &'a self,
        origin: &'a RoutePoint,
        destination: &'a RoutePoint,
        _mode: TravelMode,
    ) -> BoxFuture<'a, Result<DirectionsResult, AppError>> {
        Box::pin(async move {
            let name = destination.name.clone().unwrap_or_default();
            if let Some(delay) = self.delays.get(&name) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&name) {
                return Err(AppError::Upstream("Directions status ZERO_RESULTS".to_string()));
            }

            Ok(DirectionsResult {
                info: RouteInfo {
                    distance: format!("to {}", name),
                    duration: "1 min".to_string(),
                },
                path: vec![origin.position, destination.position],
            })
        })
    }
}

/// Autocomplete returning fixed candidates and answering details from a table.
pub struct StubPlaces {
    candidates: Vec<PlaceCandidate>,
    details: HashMap<String, LatLng>,
    last_bias: Mutex<Option<PlaceBias>>,
}

impl StubPlaces {
    pub fn new(candidates: Vec<PlaceCandidate>) -> Self {
        Self {
            candidates,
            details: HashMap::new(),
            last_bias: Mutex::new(None),
        }
    }

    pub fn with_details(mut self, place_id: &str, location: LatLng) -> Self {
        self.details.insert(place_id.to_string(), location);
        self
    }

    pub fn last_bias(&self) -> Option<PlaceBias> {
        self.last_bias.lock().unwrap().clone()
    }
}

impl PlaceAutocomplete for StubPlaces {
    fn suggest<'a>(
        &'a self,
        _input: &'a str,
        bias: &'a PlaceBias,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, AppError>> {
        Box::pin(async move {
            *self.last_bias.lock().unwrap() = Some(bias.clone());
            Ok(self.candidates.clone())
        })
    }

    fn details<'a>(
        &'a self,
        place_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<PlaceCandidate>, AppError>> {
        Box::pin(async move {
            Ok(self.details.get(place_id).map(|location| PlaceCandidate {
                place_id: place_id.to_string(),
                name: place_id.to_string(),
                formatted_address: None,
                location: Some(*location),
            }))
        })
    }
}

/// Poll the view until `predicate` holds, for up to two seconds.
pub async fn state_where<F>(view: &MapView, predicate: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    for _ in 0..200 {
        let state = view.session_snapshot().await;
        if predicate(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached the expected state");
}
