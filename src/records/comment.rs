use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, limits};

/// Free-text notes about a specimen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Comment {
    /// Immutable identifier.
    pub id: Uuid,
    pub description: String,
    #[serde(default)]
    pub cool_facts: Option<String>,
    /// Distribution in the world.
    #[serde(default)]
    pub ww_distribution: Option<String>,
    /// Protection status.
    #[serde(default)]
    pub protect: Option<String>,
}

impl Record for Comment {
    const KIND: RecordKind = RecordKind::Comment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("description", &self.description, limits::LONG_TEXT);
        errors.optional_text("cool_facts", self.cool_facts.as_deref(), limits::LONG_TEXT);
        errors.optional_text(
            "ww_distribution",
            self.ww_distribution.as_deref(),
            limits::LONG_TEXT,
        );
        errors.optional_text("protect", self.protect.as_deref(), limits::LONG_TEXT);
        errors.into_result()
    }
}
