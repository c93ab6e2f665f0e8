//! # Catalog Record Types
//!
//! One module per record type, plus the small value types the records share.

mod collect_place;
mod comment;
mod coord;
mod flora;
mod herbarium;
mod label;
mod taxon;

pub use collect_place::CollectPlace;
pub use comment::Comment;
pub use coord::Coord;
pub use flora::{Autochthony, Flora};
pub use herbarium::Herbarium;
pub use label::Label;
pub use taxon::Taxon;

use serde::{Deserialize, Serialize};

use crate::validate::{FieldErrors, check_coordinate};

/////////////////////////////////////////////// GeoPoint ///////////////////////////////////////////////

/// A geographic point in degrees.
///
/// Serializes as a GeoJSON point, `{"type": "Point", "coordinates": [longitude, latitude]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint {
    /// East-west position.
    pub longitude: f64,
    /// North-south position.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Checks both components against the degree bound.
    pub fn validate(&self, field: &str, errors: &mut FieldErrors) {
        errors.check(field, check_coordinate(self.longitude));
        errors.check(field, check_coordinate(self.latitude));
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<f64>,
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = String;

    fn try_from(point: GeoJsonPoint) -> Result<Self, Self::Error> {
        if point.kind != "Point" {
            return Err(format!("expected a GeoJSON Point, got {:?}", point.kind));
        }
        match point.coordinates.as_slice() {
            [longitude, latitude] => Ok(GeoPoint::new(*longitude, *latitude)),
            other => Err(format!(
                "a point needs exactly two coordinates, got {}",
                other.len()
            )),
        }
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        GeoJsonPoint {
            kind: "Point".to_string(),
            coordinates: vec![point.longitude, point.latitude],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn geo_point_is_geojson() {
        let point = GeoPoint::new(37.62, 55.75);
        let value = serde_json::to_value(point).unwrap();
        assert_eq!(value, json!({"type": "Point", "coordinates": [37.62, 55.75]}));
        let parsed: GeoPoint = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, point);
    }

    #[test]
    fn geo_point_rejects_other_geometries() {
        let line = json!({"type": "LineString", "coordinates": [1.0, 2.0]});
        assert!(serde_json::from_value::<GeoPoint>(line).is_err());
        let short = json!({"type": "Point", "coordinates": [1.0]});
        assert!(serde_json::from_value::<GeoPoint>(short).is_err());
    }

    #[test]
    fn geo_point_components_share_the_bound() {
        let mut errors = FieldErrors::new();
        GeoPoint::new(170.0, 120.0).validate("geog_point", &mut errors);
        assert!(errors.is_empty());
        GeoPoint::new(190.0, -181.0).validate("geog_point", &mut errors);
        assert_eq!(errors.get("geog_point").unwrap().len(), 2);
    }
}
