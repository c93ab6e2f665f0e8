//! # Authentication
//!
//! The REST API authenticates with API tokens, the web pages with login sessions.
//!
//! - API requests carry `Authorization: Token <key>` (or `Bearer <key>`).  A request
//!   without the header is anonymous.  An unknown key or an inactive account is rejected
//!   with 401.  [`require_permission`] resolves the identity, applies the permission rule
//!   and leaves the [`Identity`] in the request extensions for handlers.
//! - Pages read the `sessionid` cookie.  [`SessionUser`] resolves it and redirects to the
//!   login form when it is missing or stale.

use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, async_trait};
use serde::Deserialize;

use crate::account::{Account, Identity, Session, authenticate};
use crate::errors::ApiError;
use crate::html::{encode_query, escape, layout};
use crate::permission::check_permission;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Path of the login form.
pub const LOGIN_PATH: &str = "/api-auth/login/";

/// Path of the logout endpoint.
pub const LOGOUT_PATH: &str = "/api-auth/logout/";

//////////////////////////////////////////// token credentials /////////////////////////////////////////

/// Extracts the key of a `Token` or `Bearer` authorization header.
///
/// Returns `Ok(None)` for other schemes, which leave the request anonymous.
pub fn parse_authorization(value: &str) -> Result<Option<&str>, ApiError> {
    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(ApiError::AuthenticationFailed(
            "Invalid token header. No credentials provided.",
        )),
        (Some(_), Some(_)) => Err(ApiError::AuthenticationFailed(
            "Invalid token header. Token string should not contain spaces.",
        )),
    }
}

/// Resolves the identity behind the `Authorization` header of a request.
pub async fn identify(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };
    let value = value.to_str().map_err(|_| {
        ApiError::AuthenticationFailed(
            "Invalid token header. Token string should not contain invalid characters.",
        )
    })?;
    let Some(key) = parse_authorization(value)? else {
        return Ok(Identity::Anonymous);
    };
    match state.accounts.account_for_token(key).await? {
        Some(account) if account.is_active => Ok(Identity::Account(account)),
        Some(_) => Err(ApiError::AuthenticationFailed("User inactive or deleted.")),
        None => Err(ApiError::AuthenticationFailed("Invalid token.")),
    }
}

/// Middleware applying token authentication and the permission rule.
pub async fn require_permission(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match identify(&state, request.headers()).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = check_permission(request.method(), &identity) {
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            authenticated = identity.is_authenticated(),
            "permission denied"
        );
        return e.into_response();
    }
    request.extensions_mut().insert(identity);
    next.run(request).await
}

//////////////////////////////////////////////// sessions //////////////////////////////////////////////

/// Reads the session key from the `Cookie` headers.
pub fn session_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

async fn session_account(state: &AppState, parts: &Parts) -> Result<Option<Account>, Response> {
    let Some(key) = session_key(&parts.headers) else {
        return Ok(None);
    };
    match state.accounts.account_for_session(key).await {
        Ok(account) => Ok(account.filter(|account| account.is_active)),
        Err(e) => Err(ApiError::from(e).into_response()),
    }
}

/// Builds the redirect to the login form that returns to `next` afterwards.
pub fn login_redirect(next: &str) -> Response {
    let location = format!("{}?next={}", LOGIN_PATH, encode_query(next));
    redirect(&location)
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))])
            .into_response(),
    }
}

/// The account of a logged-in page visitor.
///
/// Rejects with a redirect to the login form.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_account(state, parts).await? {
            Some(account) => Ok(SessionUser(account)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(login_redirect(next))
            }
        }
    }
}

/// The account of a page visitor, if logged in.
#[derive(Debug, Clone)]
pub struct MaybeSessionUser(pub Option<Account>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeSessionUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeSessionUser(session_account(state, parts).await?))
    }
}

impl MaybeSessionUser {
    /// Username of the visitor, if logged in.
    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|account| account.username.as_str())
    }
}

/////////////////////////////////////////////// login pages ////////////////////////////////////////////

/// Query string of the login form.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Where to go after logging in.
    pub next: Option<String>,
}

/// Fields posted by the login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Login name.
    pub username: String,
    /// Password in clear text.
    pub password: String,
    /// Where to go after logging in.
    #[serde(default)]
    pub next: Option<String>,
}

/// Accepts only local absolute paths as redirect targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.contains('\\')
                && !next.chars().any(char::is_control) =>
        {
            next
        }
        _ => "/",
    }
}

fn login_page(next: &str, username: &str, error: Option<&str>, user: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default();
    let body = format!(
        "{error}<form method=\"post\" action=\"{action}\">\n\
         <label>Username <input type=\"text\" name=\"username\" value=\"{username}\" autofocus></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <input type=\"hidden\" name=\"next\" value=\"{next}\">\n\
         <button type=\"submit\">Log in</button>\n</form>",
        error = error,
        action = LOGIN_PATH,
        username = escape(username),
        next = escape(next),
    );
    Html(layout("Log in", user, &body))
}

/// `GET /api-auth/login/`: the login form.
pub async fn login_form(visitor: MaybeSessionUser, Query(query): Query<LoginQuery>) -> Html<String> {
    login_page(safe_next(query.next.as_deref()), "", None, visitor.username())
}

/// `POST /api-auth/login/`: checks credentials and opens a session.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();
    let account = match authenticate(state.accounts.as_ref(), &form.username, &form.password).await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            tracing::info!(username = %form.username, "failed login");
            return login_page(
                &next,
                &form.username,
                Some("Please enter a correct username and password."),
                None,
            )
            .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };
    let session = Session::open(account.id, state.config.session_days);
    if let Err(e) = state.accounts.create_session(&session).await {
        return ApiError::from(e).into_response();
    }
    tracing::info!(username = %account.username, "logged in");
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.key,
        state.config.session_days.saturating_mul(24 * 60 * 60)
    );
    let mut response = redirect(&next);
    if let Ok(cookie) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// `GET|POST /api-auth/logout/`: closes the session and returns home.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(key) = session_key(&headers) {
        if let Err(e) = state.accounts.delete_session(key).await {
            return ApiError::from(e).into_response();
        }
    }
    let mut response = redirect("/");
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("sessionid=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"),
    );
    response
}
