//! # Command Handlers
//!
//! Command handlers for the gardenctl and garden-admin binaries.
//!
//! ## Structure
//!
//! - `record` - Record commands for every collection (list, get, create, update, patch,
//!   delete) and picture upload
//! - `admin` - Account management against the database (createuser, token)
//! - `shared` - Shared utilities and validation functions

pub mod admin;
pub mod error_extensions;
pub mod errors;
pub mod record;
pub mod shared;

pub use admin::{handle_createuser_command, handle_token_command};
pub use record::{Collection, handle_record_command, handle_upload_command};
