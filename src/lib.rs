//! # Garden: a botanical specimen catalog
//!
//! Garden records botanical specimens together with their taxonomy, where they were
//! collected, the herbarium sheet, labels, comments and coordinates.  It serves the
//! catalog twice: as server-rendered pages for people who are logged in, and as a
//! hyperlinked REST API for scripts and the `gardenctl` client.
//!
//! ## Core Concepts
//!
//! ### Records
//! Seven record types ([`Flora`], [`Taxon`], [`CollectPlace`], [`Coord`], [`Herbarium`],
//! [`Label`], [`Comment`]) are plain serde structs.  Each implements [`Record`], and its
//! static description (columns, links, ordering, URL names) hangs off a [`RecordKind`].
//! Stores, pages and the API are written once against `RecordKind` and JSON rows.
//!
//! ### Links
//! Records point at each other by id.  Most links are one-to-one; many labels may share a
//! plant.  A link must name an existing record, and deleting a record deletes every record
//! that links to it, transitively.
//!
//! ### Permissions
//! The API lets any authenticated account read and `PATCH`; only superusers may `POST`,
//! `PUT` and `DELETE`.  Anonymous callers are refused with 401, others with 403.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Pages, REST API, login, media (axum)    │
//! ├─────────────────────────────────────────┤
//! │ Token / session auth, permission rule   │
//! ├─────────────────────────────────────────┤
//! │ Records, validation, representation     │
//! ├─────────────────────────────────────────┤
//! │ RecordStore / AccountStore / ObjectStore│
//! ├─────────────────────────────────────────┤
//! │ PostgreSQL, filesystem, or in memory    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Examples
//!
//! ### Validating a record
//!
//! ```rust
//! use garden::{Coord, Record};
//! use uuid::Uuid;
//!
//! let coord = Coord {
//!     id: Uuid::new_v4(),
//!     altitude: Some(-1.0),
//!     longitude: 21.433,
//!     latitude: 12.343,
//!     geog_point: None,
//! };
//! let errors = coord.validate().unwrap_err();
//! assert!(errors.get("altitude").is_some());
//! ```
//!
//! ### Serving the catalog from memory
//!
//! ```rust
//! use garden::{AppState, GardenConfig, create_router};
//!
//! let state = AppState::in_memory(GardenConfig::default());
//! let app = create_router(state);
//! # let _ = app;
//! ```

extern crate self as garden;

mod record;
mod records;
mod router;
mod validate;

/// Accounts, password hashing, API tokens and login sessions.
pub mod account;

/// The generic REST resources under `/api/`.
pub mod api;

/// Token and session authentication for the API and the pages.
pub mod auth;

/// Command-line interface utilities for program termination and output formatting.
pub mod cli_utils;

/// Command handlers for the gardenctl and garden-admin binaries.
pub mod commands;

/// Server configuration read from the environment.
pub mod config;

/// Record and account storage traits and the in-memory store.
pub mod data_store;

/// Error types and their HTTP mapping.
pub mod errors;

/// HTML helpers for the pages.
pub mod html;

/// HTTP client for the garden REST API.
pub mod http_utils;

/// Public object serving under `/media/`.
pub mod media;

/// Object storage for uploaded pictures.
pub mod object_store;

/// Lenient page-number pagination.
pub mod paginate;

/// Home, list and detail pages.
pub mod pages;

/// The permission rule applied to every API request.
pub mod permission;

/// PostgreSQL storage.
pub mod sql;

/// Shared application state.
pub mod state;

pub use account::{Account, Identity, Session};
pub use config::{ConfigError, GardenConfig};
pub use data_store::{AccountStore, InMemoryDataStore, RecordStore};
pub use errors::{ApiError, StoreError};
pub use object_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore, ObjectStoreError};
pub use record::{Column, Columns, FieldType, Link, Record, RecordKind, RecordKindParseError};
pub use records::{
    Autochthony, CollectPlace, Comment, Coord, Flora, GeoPoint, Herbarium, Label, Taxon,
};
pub use router::create_router;
pub use sql::PgStore;
pub use state::AppState;
pub use validate::{
    FieldErrors, MAX_DEGREE, MIN_DEGREE, ValidationError, check_coordinate,
    check_date_not_future, check_max_length, check_non_negative, check_not_blank,
    check_not_future, check_not_future_at, limits,
};
