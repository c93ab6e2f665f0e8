//! The permission rule guarding the REST API.
//!
//! Any authenticated, active account may use the safe methods GET, HEAD, OPTIONS and
//! PATCH.  POST, PUT and DELETE are reserved for superusers.  Every other method is
//! denied.  PATCH counts as safe while PUT does not.

use axum::http::Method;

use crate::account::Identity;
use crate::errors::ApiError;

/// Methods any authenticated account may use.
pub const SAFE_METHODS: &[Method] = &[Method::GET, Method::HEAD, Method::OPTIONS, Method::PATCH];

/// Methods reserved for superusers.
pub const SUPERUSER_METHODS: &[Method] = &[Method::POST, Method::PUT, Method::DELETE];

/// True when `method` is open to any authenticated account.
pub fn is_safe_method(method: &Method) -> bool {
    SAFE_METHODS.contains(method)
}

/// True when `identity` may issue a request with `method`.
pub fn has_permission(method: &Method, identity: &Identity) -> bool {
    if !identity.is_authenticated() {
        return false;
    }
    if is_safe_method(method) {
        return true;
    }
    SUPERUSER_METHODS.contains(method) && identity.is_superuser()
}

/// Applies the rule: anonymous callers get 401, authenticated ones 403.
pub fn check_permission(method: &Method, identity: &Identity) -> Result<(), ApiError> {
    if has_permission(method, identity) {
        Ok(())
    } else if identity.is_authenticated() {
        Err(ApiError::PermissionDenied)
    } else {
        Err(ApiError::NotAuthenticated)
    }
}
