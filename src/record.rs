//! # Records
//!
//! The catalog holds seven record types.  Each is a plain serde struct implementing
//! [`Record`]; its static description (column set, links to other records, default
//! ordering, storage table and URL names) hangs off a [`RecordKind`].  Generic code in the
//! store, API and page layers only ever talks to `RecordKind` and `serde_json::Value` rows,
//! so adding a record type never touches them.
//!
//! ```text
//! Flora ──1:1──> Taxon
//!   │  ──1:1──> CollectPlace ──1:1──> Coord
//!   │  ──1:1──> Herbarium                ^
//!   │  ──1:1──> Comment                  │
//!   ^                                   1:1
//!   └──────n:1───────── Label ───────────┘
//! ```
//!
//! Every link cascades on delete.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::FieldErrors;
use crate::{CollectPlace, Comment, Coord, Flora, Herbarium, Label, Taxon};

/////////////////////////////////////////////// Columns ////////////////////////////////////////////////

/// Coarse type of a record column, used for API metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// True or false.
    Boolean,
    /// Floating point number.
    Float,
    /// Integer number.
    Integer,
    /// UUID identifier or link.
    Uuid,
    /// Timestamp with time zone.
    DateTime,
    /// Calendar date.
    Date,
    /// Any other type, named by its Rust type.
    Other(&'static str),
}

impl FieldType {
    /// Name used in OPTIONS metadata.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Text => "string",
            FieldType::Boolean => "boolean",
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Uuid => "uuid",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Other(_) => "field",
        }
    }
}

/// Static description of one record column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field and column name.
    pub name: &'static str,
    /// Coarse type of the column.
    pub field_type: FieldType,
    /// Whether a client must supply the field on create and full update.
    pub required: bool,
    /// Whether the field accepts null.
    pub nullable: bool,
}

/// Types with a static column description, usually derived with `garden_derive::Columns`.
pub trait Columns {
    /// Every column, in declaration order.
    const COLUMNS: &'static [Column];
}

//////////////////////////////////////////////// Link //////////////////////////////////////////////////

/// A field of one record type that holds the id of another record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Field holding the target id.
    pub field: &'static str,
    /// Record type the field points at.
    pub target: RecordKind,
    /// True for one-to-one links: a target is referenced by at most one record.
    pub unique: bool,
}

const fn one_to_one(field: &'static str, target: RecordKind) -> Link {
    Link {
        field,
        target,
        unique: true,
    }
}

const FLORA_LINKS: &[Link] = &[
    one_to_one("taxon", RecordKind::Taxon),
    one_to_one("collect_place", RecordKind::CollectPlace),
    one_to_one("herbarium", RecordKind::Herbarium),
    one_to_one("comment", RecordKind::Comment),
];
const COLLECT_PLACE_LINKS: &[Link] = &[one_to_one("coord", RecordKind::Coord)];
const LABEL_LINKS: &[Link] = &[
    Link {
        field: "plant",
        target: RecordKind::Flora,
        unique: false,
    },
    one_to_one("coord", RecordKind::Coord),
];

///////////////////////////////////////////// RecordKind ///////////////////////////////////////////////

/// The seven record types of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A botanical specimen.
    Flora,
    /// A taxonomic classification.
    Taxon,
    /// Where a specimen was collected.
    CollectPlace,
    /// A geographic coordinate.
    Coord,
    /// A herbarium entry.
    Herbarium,
    /// A descriptive label.
    Label,
    /// A free-text comment.
    Comment,
}

impl RecordKind {
    /// Every record kind, in the order the home page lists them.
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Flora,
        RecordKind::Herbarium,
        RecordKind::CollectPlace,
        RecordKind::Taxon,
        RecordKind::Comment,
        RecordKind::Label,
        RecordKind::Coord,
    ];

    /// Singular snake_case name, used for detail page paths.
    pub fn singular(&self) -> &'static str {
        match self {
            RecordKind::Flora => "flora",
            RecordKind::Taxon => "taxon",
            RecordKind::CollectPlace => "collect_place",
            RecordKind::Coord => "coord",
            RecordKind::Herbarium => "herbarium",
            RecordKind::Label => "label",
            RecordKind::Comment => "comment",
        }
    }

    /// Collection name, used for list pages and API paths.
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Flora => "floras",
            RecordKind::Taxon => "taxons",
            RecordKind::CollectPlace => "collect_places",
            RecordKind::Coord => "coords",
            RecordKind::Herbarium => "herbariums",
            RecordKind::Label => "labels",
            RecordKind::Comment => "comments",
        }
    }

    /// Human readable name.
    pub fn title(&self) -> &'static str {
        match self {
            RecordKind::Flora => "Flora",
            RecordKind::Taxon => "Taxon",
            RecordKind::CollectPlace => "Collect place",
            RecordKind::Coord => "Coordinate",
            RecordKind::Herbarium => "Herbarium",
            RecordKind::Label => "Label",
            RecordKind::Comment => "Comment",
        }
    }

    /// Table inside the `garden` schema.
    pub fn table(&self) -> &'static str {
        self.singular()
    }

    /// Every column of the record type.
    pub fn columns(&self) -> &'static [Column] {
        match self {
            RecordKind::Flora => Flora::COLUMNS,
            RecordKind::Taxon => Taxon::COLUMNS,
            RecordKind::CollectPlace => CollectPlace::COLUMNS,
            RecordKind::Coord => Coord::COLUMNS,
            RecordKind::Herbarium => Herbarium::COLUMNS,
            RecordKind::Label => Label::COLUMNS,
            RecordKind::Comment => Comment::COLUMNS,
        }
    }

    /// Fields holding ids of other records.
    pub fn links(&self) -> &'static [Link] {
        match self {
            RecordKind::Flora => FLORA_LINKS,
            RecordKind::CollectPlace => COLLECT_PLACE_LINKS,
            RecordKind::Label => LABEL_LINKS,
            RecordKind::Taxon | RecordKind::Coord | RecordKind::Herbarium | RecordKind::Comment => {
                &[]
            }
        }
    }

    /// Returns the link stored in `field`, if any.
    pub fn link(&self, field: &str) -> Option<&'static Link> {
        self.links().iter().find(|link| link.field == field)
    }

    /// Fields clients may not set through the JSON API.
    pub fn read_only(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Flora => &["id", "url", "picture"],
            _ => &["id", "url"],
        }
    }

    /// Alternative input names, as `(alias, field)` pairs.
    pub fn aliases(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            RecordKind::Flora => &[("rus_name", "local_name")],
            _ => &[],
        }
    }

    /// Accepted values of a field restricted to a fixed set.
    pub fn choices(&self, field: &str) -> Option<&'static [&'static str]> {
        match (self, field) {
            (RecordKind::Flora, "autochthony") => Some(&["autochthonous", "introduced", "invasive"]),
            _ => None,
        }
    }

    /// Default list ordering; always ends with `id`.
    pub fn ordering(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Flora => &["taxonomycol", "author", "id"],
            RecordKind::Taxon => &["genus", "species", "id"],
            RecordKind::CollectPlace => &["country", "region", "id"],
            RecordKind::Herbarium => &["depart", "region", "id"],
            RecordKind::Label => &["institute", "project", "name", "id"],
            RecordKind::Coord | RecordKind::Comment => &["id"],
        }
    }

    /// Fields shown as columns on list pages.
    pub fn summary(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Flora => &["taxonomycol", "author", "local_name", "alive"],
            RecordKind::Taxon => &["genus", "species", "family"],
            RecordKind::CollectPlace => &["country", "region", "city"],
            RecordKind::Coord => &["latitude", "longitude", "altitude"],
            RecordKind::Herbarium => &["depart", "region"],
            RecordKind::Label => &["name", "institute", "project", "collected"],
            RecordKind::Comment => &["description"],
        }
    }

    /// Record kinds with a link pointing at this kind.
    pub fn referrers(&self) -> impl Iterator<Item = (RecordKind, &'static Link)> + '_ {
        RecordKind::ALL.into_iter().flat_map(move |kind| {
            kind.links()
                .iter()
                .filter(move |link| link.target == *self)
                .map(move |link| (kind, link))
        })
    }

    /// Looks a kind up by its collection name.
    pub fn from_collection(collection: &str) -> Option<RecordKind> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.collection() == collection)
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.singular())
    }
}

/// Error returned when a string names no record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKindParseError(String);

impl Display for RecordKindParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "unknown record kind {:?}", self.0)
    }
}

impl std::error::Error for RecordKindParseError {}

impl FromStr for RecordKind {
    type Err = RecordKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.singular() == s || kind.collection() == s)
            .ok_or_else(|| RecordKindParseError(s.to_string()))
    }
}

/////////////////////////////////////////////// Record /////////////////////////////////////////////////

/// A catalog record.
///
/// The serde representation of a record is its storage row: one key per column, link
/// fields hold bare ids.
pub trait Record: Columns + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The kind describing this record type.
    const KIND: RecordKind;

    /// The immutable identifier of the record.
    fn id(&self) -> Uuid;

    /// Checks every field-level invariant.
    fn validate(&self) -> Result<(), FieldErrors>;
}
