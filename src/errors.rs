//! Error types for garden operations.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::validate::FieldErrors;

////////////////////////////////////////////// StoreError //////////////////////////////////////////////

/// Errors that can occur during record and account store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested item was not found in the store.
    NotFound,
    /// An item with the same identifier already exists.
    AlreadyExists,
    /// A link field points at a record that does not exist.
    MissingReference(String),
    /// A one-to-one link field points at a record another record already links to.
    DuplicateLink(String),
    /// JSON serialization or deserialization failed.
    SerializationError(String),
    /// An internal storage system error occurred.
    Internal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Item not found in store"),
            Self::AlreadyExists => write!(f, "Item already exists in store"),
            Self::MissingReference(field) => {
                write!(f, "Field {} points at a record that does not exist", field)
            }
            Self::DuplicateLink(field) => {
                write!(f, "Field {} points at a record that is already linked", field)
            }
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::AlreadyExists
            }
            _ => StoreError::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

impl std::error::Error for StoreError {}

/////////////////////////////////////////////// ApiError ///////////////////////////////////////////////

/// Errors surfaced at the HTTP boundary of the REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// One or more fields violate a record invariant.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The request body could not be understood.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The request body has a media type the API does not parse.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// No credentials were presented for an operation that requires them.
    #[error("authentication credentials were not provided")]
    NotAuthenticated,

    /// Credentials were presented but do not resolve to an active account.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// The caller is authenticated but may not perform the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// The identifier does not resolve to an existing record.
    #[error("not found")]
    NotFound,

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The object store rejected the operation.
    #[error(transparent)]
    Objects(#[from] crate::object_store::ObjectStoreError),
}

impl ApiError {
    fn field_error(field: &str, message: String) -> Response {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message]);
        (StatusCode::BAD_REQUEST, Json(errors)).into_response()
    }

    fn detail(status: StatusCode, detail: &str) -> Response {
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::MalformedPayload(msg) => Self::detail(StatusCode::BAD_REQUEST, &msg),
            ApiError::UnsupportedMediaType(media_type) => Self::detail(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                &format!("Unsupported media type \"{}\" in request.", media_type),
            ),
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Token")],
                Json(json!({ "detail": "Authentication credentials were not provided." })),
            )
                .into_response(),
            ApiError::AuthenticationFailed(reason) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Token")],
                Json(json!({ "detail": reason })),
            )
                .into_response(),
            ApiError::PermissionDenied => Self::detail(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            ApiError::NotFound | ApiError::Store(StoreError::NotFound) => {
                Self::detail(StatusCode::NOT_FOUND, "Not found.")
            }
            ApiError::Store(StoreError::MissingReference(field)) => Self::field_error(
                &field,
                "Invalid hyperlink - Object does not exist.".to_string(),
            ),
            ApiError::Store(StoreError::DuplicateLink(field)) => Self::field_error(
                &field,
                format!("A record with this {} already exists.", field),
            ),
            ApiError::Store(StoreError::AlreadyExists) => {
                Self::detail(StatusCode::CONFLICT, "A record with this id already exists.")
            }
            ApiError::Objects(crate::object_store::ObjectStoreError::InvalidKey(key)) => {
                Self::detail(StatusCode::BAD_REQUEST, &format!("Invalid object key: {}", key))
            }
            err => {
                tracing::error!(error = %err, "request failed");
                Self::detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
            }
        }
    }
}
