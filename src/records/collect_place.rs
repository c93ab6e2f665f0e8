use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, limits};

/// Where a specimen was collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct CollectPlace {
    /// Immutable identifier.
    pub id: Uuid,
    pub country: String,
    pub region: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Coordinate of the place; at most one place per coordinate.
    #[serde(default)]
    pub coord: Option<Uuid>,
}

impl Record for CollectPlace {
    const KIND: RecordKind = RecordKind::CollectPlace;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("country", &self.country, limits::SHORT_TEXT);
        errors.required_text("region", &self.region, limits::SHORT_TEXT);
        errors.optional_text("city", self.city.as_deref(), limits::SHORT_TEXT);
        errors.into_result()
    }
}
