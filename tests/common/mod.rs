//! Shared fixtures for the HTTP tests: an in-memory garden behind an axum-test server,
//! with one superuser and one ordinary account.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum_test::{TestRequest, TestServer};
use serde_json::{Value, json};

use garden::account::{Account, Session, issue_token};
use garden::{AppState, GardenConfig, create_router};

/// PBKDF2 iterations for test accounts; production hashes are far slower.
const FAST_HASH: u32 = 1_000;

/// Password of both test accounts.
pub const PASSWORD: &str = "correct horse";

pub struct GardenTest {
    pub server: TestServer,
    pub state: AppState,
    pub admin: Account,
    pub user: Account,
    pub admin_token: String,
    pub user_token: String,
}

impl GardenTest {
    pub async fn new() -> Self {
        Self::with_config(GardenConfig::default()).await
    }

    pub async fn with_config(config: GardenConfig) -> Self {
        let state = AppState::in_memory(config);
        state.ensure_buckets().await.unwrap();
        Self::with_state(state).await
    }

    /// Serves `state` as it is; buckets are not created up front.
    pub async fn with_state(state: AppState) -> Self {
        let admin = Account::with_iterations("admin", PASSWORD, true, FAST_HASH).unwrap();
        let user = Account::with_iterations("botanist", PASSWORD, false, FAST_HASH).unwrap();
        state.accounts.create_account(&admin).await.unwrap();
        state.accounts.create_account(&user).await.unwrap();
        let admin_token = issue_token(state.accounts.as_ref(), &admin).await.unwrap();
        let user_token = issue_token(state.accounts.as_ref(), &user).await.unwrap();

        let server = TestServer::new(create_router(state.clone())).unwrap();
        Self {
            server,
            state,
            admin,
            user,
            admin_token,
            user_token,
        }
    }

    /// Opens a login session for `account` and returns its cookie header.
    pub async fn session_cookie(&self, account: &Account) -> (HeaderName, HeaderValue) {
        let session = Session::open(account.id, 14);
        self.state.accounts.create_session(&session).await.unwrap();
        cookie(&session.key)
    }

    /// A request carrying `token`, or an anonymous one.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> TestRequest {
        let request = self.server.method(method, path);
        match token {
            Some(token) => {
                let (name, value) = authorization(token);
                request.add_header(name, value)
            }
            None => request,
        }
    }

    pub fn as_admin(&self, method: Method, path: &str) -> TestRequest {
        self.request(method, path, Some(&self.admin_token))
    }

    pub fn as_user(&self, method: Method, path: &str) -> TestRequest {
        self.request(method, path, Some(&self.user_token))
    }

    /// Creates a record as the superuser and returns its representation.
    pub async fn create(&self, collection: &str, body: Value) -> Value {
        let response = self
            .as_admin(Method::POST, &format!("/api/{}/", collection))
            .json(&body)
            .await;
        assert_eq!(
            response.status_code(),
            201,
            "creating {} failed: {}",
            collection,
            response.text()
        );
        response.json::<Value>()
    }
}

pub fn authorization(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Token {}", token)).unwrap(),
    )
}

pub fn cookie(key: &str) -> (HeaderName, HeaderValue) {
    (
        header::COOKIE,
        HeaderValue::from_str(&format!("sessionid={}", key)).unwrap(),
    )
}

/// The path part of an absolute URL, for following hyperlinks through the test server.
pub fn path_of(url: &str) -> String {
    url::Url::parse(url).unwrap().path().to_string()
}

/// A valid payload for every collection.
pub fn payloads() -> Vec<(&'static str, Value)> {
    vec![
        ("collect_places", json!({ "country": "Russia", "region": "Moscow" })),
        ("comments", json!({ "description": "Found near the old oak." })),
        (
            "coords",
            json!({ "altitude": 3.893, "longitude": 21.433, "latitude": 12.343 }),
        ),
        (
            "floras",
            json!({ "alive": true, "author": "Ford", "taxonomycol": "Forda" }),
        ),
        ("herbariums", json!({ "depart": "Russia", "region": "Moscow" })),
        (
            "labels",
            json!({ "institute": "Russia", "project": "Moscow", "name": "forda" }),
        ),
        ("taxons", json!({ "genus": "asd", "species": "asd" })),
    ]
}
