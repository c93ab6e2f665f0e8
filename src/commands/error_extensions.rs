//! `Handle<UserError>` for the parse and I/O errors `gardenctl` can hit before a request
//! is ever sent.

use super::errors::UserError;
use crate::record::{RecordKind, RecordKindParseError};
use handled::Handle;

/// Unknown collection names list the valid ones.
impl Handle<UserError> for RecordKindParseError {
    fn handle(&self) -> Option<UserError> {
        let names: Vec<&str> = RecordKind::ALL.iter().map(|kind| kind.collection()).collect();
        Some(UserError {
            message: self.to_string(),
            usage_hint: Some(format!("Use one of: {}", names.join(", "))),
        })
    }
}

impl Handle<UserError> for uuid::Error {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("Invalid record id: {}", self),
            usage_hint: Some(
                "Record ids are UUIDs such as 67e55044-10b1-426f-9247-bb680e5fe0c8".to_string(),
            ),
        })
    }
}

impl Handle<UserError> for serde_json::Error {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("JSON parsing error: {}", self),
            usage_hint: Some(
                "Pass the record as a JSON object, e.g. '{\"genus\": \"Quercus\", \"species\": \"robur\"}'"
                    .to_string(),
            ),
        })
    }
}

/// Reading an upload from disk.
impl Handle<UserError> for std::io::Error {
    fn handle(&self) -> Option<UserError> {
        let hint = match self.kind() {
            std::io::ErrorKind::NotFound => {
                Some("The specified file was not found. Check the file path.".to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                Some("Permission denied. Check file permissions.".to_string())
            }
            std::io::ErrorKind::InvalidData => Some("The file contains invalid data.".to_string()),
            _ => None,
        };

        Some(UserError {
            message: format!("File operation error: {}", self),
            usage_hint: hint,
        })
    }
}
