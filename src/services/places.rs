//! Place autocomplete: free text to candidates, scoped by a [`PlaceBias`].

use serde::Deserialize;

use super::{BoxFuture, MAPS_API_BASE};
use crate::errors::AppError;
use crate::models::{LatLng, PlaceBias, PlaceCandidate};

pub trait PlaceAutocomplete: Send + Sync {
    fn suggest<'a>(
        &'a self,
        input: &'a str,
        bias: &'a PlaceBias,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, AppError>>;

    /// Look a candidate up by id, with geometry when the provider has it.
    fn details<'a>(
        &'a self,
        place_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<PlaceCandidate>, AppError>>;
}

/// Places web service client (autocomplete + details).
pub struct GooglePlaces {
    http: reqwest::Client,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

/// `rectangle:south,west|north,east` as the web service expects it.
fn rectangle(bias: &PlaceBias) -> String {
    format!(
        "rectangle:{}|{}",
        bias.bounds.south_west.to_query_value(),
        bias.bounds.north_east.to_query_value()
    )
}

impl PlaceAutocomplete for GooglePlaces {
    fn suggest<'a>(
        &'a self,
        input: &'a str,
        bias: &'a PlaceBias,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, AppError>> {
        Box::pin(async move {
            let area_key = if bias.strict_bounds {
                "locationrestriction"
            } else {
                "locationbias"
            };

            let body = self
                .http
                .get(format!("{}/place/autocomplete/json", MAPS_API_BASE))
                .query(&[
                    ("input", input.to_string()),
                    ("components", format!("country:{}", bias.country)),
                    (area_key, rectangle(bias)),
                    ("key", self.api_key.clone()),
                ])
                .send()
                .await?
                .text()
                .await?;

            parse_autocomplete(&body)
        })
    }

    fn details<'a>(
        &'a self,
        place_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<PlaceCandidate>, AppError>> {
        Box::pin(async move {
            let body = self
                .http
                .get(format!("{}/place/details/json", MAPS_API_BASE))
                .query(&[
                    ("place_id", place_id),
                    ("fields", "geometry,name,formatted_address"),
                    ("key", self.api_key.as_str()),
                ])
                .send()
                .await?
                .text()
                .await?;

            parse_details(place_id, &body)
        })
    }
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
    #[serde(default)]
    structured_formatting: Option<StructuredFormatting>,
}

#[derive(Deserialize)]
struct StructuredFormatting {
    main_text: String,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<DetailsResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResult {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

fn status_error(kind: &str, status: &str, message: Option<String>) -> AppError {
    AppError::Upstream(format!(
        "{} status {}{}",
        kind,
        status,
        message.map(|m| format!(": {}", m)).unwrap_or_default()
    ))
}

/// Predictions carry no geometry; they resolve through `details` on selection.
pub fn parse_autocomplete(body: &str) -> Result<Vec<PlaceCandidate>, AppError> {
    let resp: AutocompleteResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("Unreadable autocomplete response: {}", e)))?;

    match resp.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        other => return Err(status_error("Autocomplete", other, resp.error_message)),
    }

    Ok(resp
        .predictions
        .into_iter()
        .map(|p| PlaceCandidate {
            name: p
                .structured_formatting
                .map(|f| f.main_text)
                .unwrap_or_else(|| p.description.clone()),
            place_id: p.place_id,
            formatted_address: Some(p.description),
            location: None,
        })
        .collect())
}

pub fn parse_details(place_id: &str, body: &str) -> Result<Option<PlaceCandidate>, AppError> {
    let resp: DetailsResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("Unreadable place details response: {}", e)))?;

    match resp.status.as_str() {
        "OK" => {}
        "NOT_FOUND" | "ZERO_RESULTS" => return Ok(None),
        other => return Err(status_error("Place details", other, resp.error_message)),
    }

    Ok(resp.result.map(|r| PlaceCandidate {
        place_id: place_id.to_string(),
        name: r
            .name
            .or_else(|| r.formatted_address.clone())
            .unwrap_or_default(),
        formatted_address: r.formatted_address,
        location: r.geometry.map(|g| g.location),
    }))
}
