//! Turns typed text and selected candidates into route endpoints.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{LatLng, PlaceBias, PlaceCandidate, RoutePoint};
use crate::services::PlaceAutocomplete;

pub struct PlaceResolver {
    autocomplete: Arc<dyn PlaceAutocomplete>,
    bias: PlaceBias,
}

impl PlaceResolver {
    pub fn new(autocomplete: Arc<dyn PlaceAutocomplete>, bias: PlaceBias) -> Self {
        Self { autocomplete, bias }
    }

    pub async fn suggest(&self, input: &str) -> Result<Vec<PlaceCandidate>, AppError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Vec::new());
        }
        self.autocomplete.suggest(input, &self.bias).await
    }

    /// Resolve a selected candidate to a point named after it.
    ///
    /// Candidates without geometry go through a details lookup. `None` means
    /// the selection has no usable location and must be ignored.
    pub async fn resolve(&self, candidate: &PlaceCandidate) -> Result<Option<RoutePoint>, AppError> {
        let location = match candidate.location {
            Some(location) => Some(location),
            None => self
                .autocomplete
                .details(&candidate.place_id)
                .await?
                .and_then(|details| details.location),
        };

        let Some(location) = location else {
            tracing::info!("Ignoring place '{}' without geometry", candidate.place_id);
            return Ok(None);
        };
        let location = match LatLng::new(location.lat, location.lng) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Ignoring place '{}': {}", candidate.place_id, e);
                return Ok(None);
            }
        };

        Ok(Some(RoutePoint::new(location, Some(candidate.name.clone()))))
    }
}
