//! Report model: a crowdsourced checkpoint sighting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{LatLng, UserId};

/// Verification count every freshly captured report starts with.
pub const INITIAL_VERIFIED_COUNT: u32 = 1;

/// Document field names, shared by the store and the feed.
pub mod fields {
    pub const LAT: &str = "lat";
    pub const LNG: &str = "lng";
    pub const TIMESTAMP: &str = "timestamp";
    pub const REPORTER_ID: &str = "reporterId";
    pub const VERIFIED_COUNT: &str = "verifiedCount";
}

/// A raw document as held by the report store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// A sighting as rendered on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub verified_count: u32,
    /// Seconds since the epoch, assigned by the store.
    pub timestamp: i64,
}

impl Report {
    /// Derive a report from a stored document.
    ///
    /// Missing or malformed numeric fields default to zero instead of
    /// rejecting the document, so every document in a snapshot renders.
    pub fn from_document(doc: &ReportDocument) -> Self {
        let lat = coordinate(doc.fields.get(fields::LAT), 90.0);
        let lng = coordinate(doc.fields.get(fields::LNG), 180.0);

        let verified_count = doc
            .fields
            .get(fields::VERIFIED_COUNT)
            .and_then(Value::as_i64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);

        Self {
            id: doc.id.clone(),
            lat,
            lng,
            verified_count,
            timestamp: timestamp_seconds(doc.fields.get(fields::TIMESTAMP)),
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

fn coordinate(value: Option<&Value>, limit: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| (-limit..=limit).contains(v))
        .unwrap_or(0.0)
}

/// Accepts plain epoch seconds or a `{ "seconds": n }` timestamp object.
fn timestamp_seconds(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("seconds").and_then(Value::as_i64).unwrap_or(0),
        _ => 0,
    }
}

/// The create payload for a new report. The store adds the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub lat: f64,
    pub lng: f64,
    pub reporter_id: String,
    pub verified_count: u32,
}

impl NewReport {
    pub fn new(at: LatLng, reporter: &UserId) -> Self {
        Self {
            lat: at.lat,
            lng: at.lng,
            reporter_id: reporter.as_str().to_string(),
            verified_count: INITIAL_VERIFIED_COUNT,
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::LAT.to_string(), Value::from(self.lat));
        map.insert(fields::LNG.to_string(), Value::from(self.lng));
        map.insert(fields::REPORTER_ID.to_string(), Value::from(self.reporter_id));
        map.insert(
            fields::VERIFIED_COUNT.to_string(),
            Value::from(self.verified_count),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> ReportDocument {
        ReportDocument {
            id: "r1".to_string(),
            fields: value.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_from_complete_document() {
        let report = Report::from_document(&doc(json!({
            "lat": 12.9177,
            "lng": 77.6238,
            "verifiedCount": 189,
            "timestamp": 1_700_000_000,
            "reporterId": "u1"
        })));
        assert_eq!(report.id, "r1");
        assert_eq!(report.lat, 12.9177);
        assert_eq!(report.lng, 77.6238);
        assert_eq!(report.verified_count, 189);
        assert_eq!(report.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let report = Report::from_document(&doc(json!({ "lat": "twelve" })));
        assert_eq!(report.lat, 0.0);
        assert_eq!(report.lng, 0.0);
        assert_eq!(report.verified_count, 0);
        assert_eq!(report.timestamp, 0);
    }

    #[test]
    fn test_out_of_range_coordinates_default_to_zero() {
        let report = Report::from_document(&doc(json!({ "lat": 95.0, "lng": 77.6 })));
        assert_eq!(report.lat, 0.0);
        assert_eq!(report.lng, 77.6);
    }

    #[test]
    fn test_timestamp_object_and_negative_count() {
        let report = Report::from_document(&doc(json!({
            "lat": 1.0,
            "lng": 2.0,
            "verifiedCount": -3,
            "timestamp": { "seconds": 42, "nanos": 0 }
        })));
        assert_eq!(report.verified_count, 0);
        assert_eq!(report.timestamp, 42);
    }

    #[test]
    fn test_new_report_fields() {
        let at = LatLng::new(12.9, 77.6).unwrap();
        let fields = NewReport::new(at, &UserId::new("user-7")).into_fields();
        assert_eq!(fields["lat"], json!(12.9));
        assert_eq!(fields["lng"], json!(77.6));
        assert_eq!(fields["reporterId"], json!("user-7"));
        assert_eq!(fields["verifiedCount"], json!(1));
        assert!(!fields.contains_key("timestamp"));
    }
}
