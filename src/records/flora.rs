use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, check_not_future, limits};

/// How a species came to grow where it was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Autochthony {
    /// Native to the region.
    Autochthonous,
    /// Brought in by people.
    Introduced,
    /// Introduced and spreading on its own.
    Invasive,
}

/// A botanical specimen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Flora {
    /// Immutable identifier.
    pub id: Uuid,
    /// Who described the specimen.
    pub author: String,
    /// Whether the plant is still alive.
    #[serde(default = "alive_by_default")]
    pub alive: bool,
    /// Name in the Catalogue of Life taxonomy.
    pub taxonomycol: String,
    /// Who georeferenced the specimen.
    #[serde(default)]
    pub geo_author: Option<String>,
    /// Vernacular name.
    #[serde(default, alias = "rus_name")]
    pub local_name: Option<String>,
    #[serde(default)]
    pub autochthony: Option<Autochthony>,
    /// When the record was created; never in the future.
    #[serde(default = "created_now")]
    pub created: Option<DateTime<Utc>>,
    /// Object store reference of the specimen image.
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub taxon: Option<Uuid>,
    #[serde(default)]
    pub collect_place: Option<Uuid>,
    #[serde(default)]
    pub herbarium: Option<Uuid>,
    #[serde(default)]
    pub comment: Option<Uuid>,
}

fn alive_by_default() -> bool {
    true
}

fn created_now() -> Option<DateTime<Utc>> {
    Some(Utc::now())
}

impl Record for Flora {
    const KIND: RecordKind = RecordKind::Flora;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("author", &self.author, limits::AUTHOR);
        errors.required_text("taxonomycol", &self.taxonomycol, limits::SHORT_TEXT);
        errors.optional_text("geo_author", self.geo_author.as_deref(), limits::AUTHOR);
        errors.optional_text("local_name", self.local_name.as_deref(), limits::SHORT_TEXT);
        if let Some(created) = &self.created {
            errors.check("created", check_not_future(created));
        }
        errors.into_result()
    }
}
