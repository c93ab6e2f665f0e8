use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, RecordKind};
use crate::validate::{FieldErrors, limits};

/// A taxonomic classification, from domain down to subspecies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garden_derive::Columns)]
pub struct Taxon {
    /// Immutable identifier.
    pub id: Uuid,
    pub genus: String,
    pub species: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub kingdom: Option<String>,
    #[serde(default)]
    pub phylum: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub subspecies: Option<String>,
}

impl Record for Taxon {
    const KIND: RecordKind = RecordKind::Taxon;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("genus", &self.genus, limits::SHORT_TEXT);
        errors.required_text("species", &self.species, limits::SHORT_TEXT);
        for (field, rank) in [
            ("domain", &self.domain),
            ("kingdom", &self.kingdom),
            ("phylum", &self.phylum),
            ("class", &self.class),
            ("order", &self.order),
            ("family", &self.family),
            ("subspecies", &self.subspecies),
        ] {
            errors.optional_text(field, rank.as_deref(), limits::SHORT_TEXT);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn genus_and_species_suffice() {
        let taxon: Taxon = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "genus": "asd",
            "species": "asd",
        }))
        .unwrap();
        assert!(taxon.validate().is_ok());
        assert!(taxon.order.is_none());
    }

    #[test]
    fn long_rank_is_rejected() {
        let taxon = Taxon {
            id: Uuid::new_v4(),
            genus: "Quercus".to_string(),
            species: "robur".to_string(),
            domain: None,
            kingdom: None,
            phylum: None,
            class: None,
            order: Some("x".repeat(limits::SHORT_TEXT + 1)),
            family: None,
            subspecies: None,
        };
        let errors = taxon.validate().unwrap_err();
        assert!(errors.get("order").is_some());
        assert!(errors.get("genus").is_none());
    }
}
