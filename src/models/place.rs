//! Place autocomplete models.

use serde::{Deserialize, Serialize};

use super::{GeoBounds, LatLng};

/// A candidate returned by place autocomplete.
///
/// `location` is absent when the provider only returned a prediction; such a
/// candidate needs a details lookup before it can become a route endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
}

/// Scope applied to every autocomplete query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBias {
    /// ISO 3166-1 alpha-2 country code, lowercase. Always a hard filter.
    pub country: String,
    pub bounds: GeoBounds,
    /// When false the bounds only rank in-bounds candidates first.
    pub strict_bounds: bool,
}
