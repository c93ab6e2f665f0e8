//! # Command Error Handling
//!
//! This module provides error handling utilities for gardenctl and garden-admin commands
//! using the handled crate for consistent error property extraction.

use handled::Handle;

use crate::http_utils::HttpError;

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Implements Handle<UserError> for itself to allow extraction
impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

/// HTTP operation errors that provide user-friendly messages
#[derive(Debug)]
pub struct HttpOperationError {
    /// The name of the operation that failed
    pub operation: String,
    /// The HTTP status code if available
    pub status: Option<u16>,
    /// Detailed error information
    pub details: String,
}

impl std::fmt::Display for HttpOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(
                f,
                "{} failed (HTTP {}): {}",
                self.operation, status, self.details
            )
        } else {
            write!(f, "{} failed: {}", self.operation, self.details)
        }
    }
}

impl std::error::Error for HttpOperationError {}

impl Handle<UserError> for HttpOperationError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self.status {
            Some(404) => Some(
                "The requested record was not found. Check the collection and id.".to_string(),
            ),
            Some(400) => Some("Invalid request. Check your input data and try again.".to_string()),
            Some(401) => Some(
                "Authentication required. Pass --token or set GARDEN_TOKEN; garden-admin token <username> prints one."
                    .to_string(),
            ),
            Some(403) => Some(
                "Access forbidden. Creating, replacing and deleting records needs a superuser token."
                    .to_string(),
            ),
            Some(415) => Some("The server only accepts JSON bodies.".to_string()),
            Some(500..=599) => {
                Some("Server error. The service may be temporarily unavailable.".to_string())
            }
            _ => None,
        };

        Some(UserError {
            message: self.to_string(),
            usage_hint,
        })
    }
}

impl From<&HttpError> for HttpOperationError {
    fn from(error: &HttpError) -> Self {
        Self {
            operation: String::new(),
            status: Some(error.status),
            details: error.message.clone(),
        }
    }
}

impl HttpOperationError {
    /// Creates an HttpOperationError with a custom message
    pub fn new(operation: &str, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            status: None,
            details: details.to_string(),
        }
    }

    /// Names the failed operation and extracts the user-facing error.
    pub fn into_user_error(mut self, operation: &str) -> UserError {
        self.operation = operation.to_string();
        self.handle().unwrap_or_else(|| UserError {
            message: self.to_string(),
            usage_hint: None,
        })
    }
}

/// Enhanced error formatting for CLI output
pub fn format_cli_error<E>(error: &E) -> String
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        let mut output = format!("Error: {}", user_error.message);
        if let Some(hint) = user_error.usage_hint {
            output.push_str(&format!("\nHint: {}", hint));
        }
        output
    } else {
        format!("Error: {}", error)
    }
}
