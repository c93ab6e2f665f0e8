use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::api::api_router;
use crate::auth::{LOGIN_PATH, LOGOUT_PATH, login, login_form, logout};
use crate::media::serve_object;
use crate::pages::pages_router;
use crate::state::AppState;

/// Assembles the whole application: pages, REST API, login and media.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(pages_router())
        .merge(api_router(state.clone()))
        .route(LOGIN_PATH, get(login_form).post(login))
        .route(LOGOUT_PATH, get(logout).post(logout))
        .route("/media/:bucket/*key", get(serve_object))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
