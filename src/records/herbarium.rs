use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, limits};

/// A herbarium entry: which department and region hold the pressed specimen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Herbarium {
    /// Immutable identifier.
    pub id: Uuid,
    pub depart: String,
    pub region: String,
}

impl Record for Herbarium {
    const KIND: RecordKind = RecordKind::Herbarium;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("depart", &self.depart, limits::SHORT_TEXT);
        errors.required_text("region", &self.region, limits::SHORT_TEXT);
        errors.into_result()
    }
}
