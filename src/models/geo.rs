//! Geographic primitives shared by reports, routes and places.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Build a coordinate, rejecting values outside the WGS84 range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(AppError::Validation(format!(
                "Coordinate out of range: lat={}, lng={}",
                lat, lng
            )))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Parse a `"lat,lng"` pair.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let (lat, lng) = value
            .split_once(',')
            .ok_or_else(|| AppError::Validation(format!("Expected 'lat,lng', got '{}'", value)))?;
        let lat = parse_component(lat)?;
        let lng = parse_component(lng)?;
        Self::new(lat, lng)
    }

    /// Great-circle distance in metres (haversine).
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// `"lat,lng"` as expected by the maps web services.
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

fn parse_component(value: &str) -> Result<f64, AppError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("Invalid coordinate component '{}'", value)))
}

/// An axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl GeoBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Result<Self, AppError> {
        if south_west.lat > north_east.lat || south_west.lng > north_east.lng {
            return Err(AppError::Validation(
                "Bounds south-west corner must not exceed the north-east corner".to_string(),
            ));
        }
        Ok(Self {
            south_west,
            north_east,
        })
    }

    /// Parse `"south,west,north,east"`.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let parts: Vec<&str> = value.split(',').collect();
        if parts.len() != 4 {
            return Err(AppError::Validation(format!(
                "Expected 'south,west,north,east', got '{}'",
                value
            )));
        }
        let south_west = LatLng::new(parse_component(parts[0])?, parse_component(parts[1])?)?;
        let north_east = LatLng::new(parse_component(parts[2])?, parse_component(parts[3])?)?;
        Self::new(south_west, north_east)
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_range_validation() {
        assert!(LatLng::new(12.97, 77.59).is_ok());
        assert!(LatLng::new(90.0, -180.0).is_ok());
        assert!(LatLng::new(90.5, 0.0).is_err());
        assert!(LatLng::new(0.0, 180.1).is_err());
        assert!(LatLng::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_latlng_parse() {
        let point = LatLng::parse(" 12.9716, 77.5946 ").unwrap();
        assert_eq!(point, LatLng { lat: 12.9716, lng: 77.5946 });
        assert!(LatLng::parse("12.9716").is_err());
        assert!(LatLng::parse("north,east").is_err());
    }

    #[test]
    fn test_distance_silk_board_to_koramangala() {
        let silk_board = LatLng::new(12.9177, 77.6238).unwrap();
        let koramangala = LatLng::new(12.9352, 77.6245).unwrap();
        let d = silk_board.distance_m(&koramangala);
        assert!((1_900.0..2_000.0).contains(&d), "distance was {}", d);
        assert_eq!(silk_board.distance_m(&silk_board), 0.0);
    }

    #[test]
    fn test_bounds_parse_and_contains() {
        let bounds = GeoBounds::parse("12.80,77.35,13.15,77.85").unwrap();
        assert!(bounds.contains(&LatLng::new(12.9716, 77.5946).unwrap()));
        assert!(!bounds.contains(&LatLng::new(13.1986, 77.7066).unwrap()));
        assert!(GeoBounds::parse("13.15,77.85,12.80,77.35").is_err());
        assert!(GeoBounds::parse("12.80,77.35").is_err());
    }
}
