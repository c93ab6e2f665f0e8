use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, check_date_not_future, limits};

/// A descriptive label attached to a specimen.
///
/// Many labels may point at the same plant; a coordinate belongs to at most one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Label {
    /// Immutable identifier.
    pub id: Uuid,
    pub institute: String,
    pub project: String,
    /// Name written on the label.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Morphological features.
    #[serde(default)]
    pub morph_features: Option<String>,
    /// Collection date; never in the future.
    #[serde(default)]
    pub collected: Option<NaiveDate>,
    #[serde(default)]
    pub plant: Option<Uuid>,
    #[serde(default)]
    pub coord: Option<Uuid>,
}

impl Record for Label {
    const KIND: RecordKind = RecordKind::Label;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("institute", &self.institute, limits::SHORT_TEXT);
        errors.required_text("project", &self.project, limits::SHORT_TEXT);
        errors.required_text("name", &self.name, limits::SHORT_TEXT);
        errors.optional_text("description", self.description.as_deref(), limits::LONG_TEXT);
        errors.optional_text(
            "morph_features",
            self.morph_features.as_deref(),
            limits::LONG_TEXT,
        );
        if let Some(collected) = &self.collected {
            errors.check("collected", check_date_not_future(collected));
        }
        errors.into_result()
    }
}
