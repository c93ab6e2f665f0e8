use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GeoPoint;
use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, check_coordinate, check_non_negative};

/// A geographic coordinate with altitude.
///
/// Longitude and latitude share one bound of [-180, 180] degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Coord {
    /// Immutable identifier.
    pub id: Uuid,
    /// Height in metres; never negative.
    #[serde(default = "zero_altitude")]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub geog_point: Option<GeoPoint>,
}

fn zero_altitude() -> Option<f64> {
    Some(0.0)
}

impl Record for Coord {
    const KIND: RecordKind = RecordKind::Coord;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(altitude) = self.altitude {
            errors.check("altitude", check_non_negative(altitude));
        }
        errors.check("longitude", check_coordinate(self.longitude));
        errors.check("latitude", check_coordinate(self.latitude));
        if let Some(point) = &self.geog_point {
            point.validate("geog_point", &mut errors);
        }
        errors.into_result()
    }
}
