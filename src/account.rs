//! # Accounts
//!
//! Accounts authenticate people against the catalog.  Passwords are stored as salted
//! PBKDF2-SHA256 hashes in the `pbkdf2_sha256$<iterations>$<salt>$<hash>` format.  Each
//! account may hold one API token (40 lowercase hex characters) used by the REST API, and
//! any number of login sessions used by the web pages.

use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::MAX_SESSION_DAYS;
use crate::data_store::AccountStore;
use crate::errors::StoreError;

/// Iteration count for newly hashed passwords.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

const HASH_ALGORITHM: &str = "pbkdf2_sha256";
const HASH_LENGTH: usize = 32;
const SALT_BYTES: usize = 12;
const TOKEN_BYTES: usize = 20;
const SESSION_KEY_BYTES: usize = 32;

/// Errors raised while managing accounts.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The username does not match `^[\w.@+-]{1,150}$`.
    #[error("invalid username {0:?}: use at most 150 letters, digits and @/./+/-/_")]
    InvalidUsername(String),

    /// The password is empty.
    #[error("password may not be empty")]
    EmptyPassword,

    /// The account store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/////////////////////////////////////////////// Account ////////////////////////////////////////////////

/// A user of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Immutable identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Encoded password hash.
    pub password_hash: String,
    /// Superusers may create, replace and delete records.
    pub is_superuser: bool,
    /// Inactive accounts cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

impl Account {
    /// Creates an active account with a freshly hashed password.
    pub fn new(username: &str, password: &str, is_superuser: bool) -> Result<Self, AccountError> {
        Self::with_iterations(username, password, is_superuser, DEFAULT_PASSWORD_ITERATIONS)
    }

    /// Like [`Account::new`] with an explicit PBKDF2 iteration count.
    pub fn with_iterations(
        username: &str,
        password: &str,
        is_superuser: bool,
        iterations: u32,
    ) -> Result<Self, AccountError> {
        check_username(username)?;
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password, iterations),
            is_superuser,
            is_active: true,
            date_joined: Utc::now(),
        })
    }

    /// Returns true when `password` matches the stored hash.
    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Fails unless `username` is 1 to 150 word characters or any of `.@+-`.
pub fn check_username(username: &str) -> Result<(), AccountError> {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    let re = USERNAME.get_or_init(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("username pattern is valid"));
    if re.is_match(username) {
        Ok(())
    } else {
        Err(AccountError::InvalidUsername(username.to_string()))
    }
}

/////////////////////////////////////////////// Identity ///////////////////////////////////////////////

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No credentials were presented.
    #[default]
    Anonymous,
    /// An authenticated, active account.
    Account(Account),
}

impl Identity {
    /// True for an authenticated account.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Account(_))
    }

    /// True for an authenticated superuser.
    pub fn is_superuser(&self) -> bool {
        matches!(self, Identity::Account(account) if account.is_superuser)
    }

    /// The account behind the identity, if any.
    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Anonymous => None,
            Identity::Account(account) => Some(account),
        }
    }
}

/////////////////////////////////////////////// Session ////////////////////////////////////////////////

/// A login session for the web pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Random key carried in the session cookie.
    pub key: String,
    /// The logged-in account.
    pub account: Uuid,
    /// After this moment the session is no longer valid.
    pub expires: DateTime<Utc>,
}

impl Session {
    /// Opens a session for `account` that lasts `days`, at most [`MAX_SESSION_DAYS`].
    pub fn open(account: Uuid, days: i64) -> Self {
        let days = days.clamp(-MAX_SESSION_DAYS, MAX_SESSION_DAYS);
        Self {
            key: generate_session_key(),
            account,
            expires: Utc::now() + Duration::days(days),
        }
    }

    /// True when the session has expired at `now`.
    pub fn is_expired_at(&self, now: &DateTime<Utc>) -> bool {
        &self.expires <= now
    }
}

///////////////////////////////////////////// credentials //////////////////////////////////////////////

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Generates a new API token: 40 lowercase hex characters.
pub fn generate_token() -> String {
    random_hex(TOKEN_BYTES)
}

/// Generates a new session key.
pub fn generate_session_key() -> String {
    random_hex(SESSION_KEY_BYTES)
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

/// Hashes `password` with a fresh salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = random_hex(SALT_BYTES);
    let hash = derive(password, &salt, iterations);
    format!(
        "{}${}${}${}",
        HASH_ALGORITHM,
        iterations,
        salt,
        STANDARD.encode(hash)
    )
}

/// Returns true when `password` matches `encoded`; malformed hashes never match.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(4, '$');
    let (Some(algorithm), Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if algorithm != HASH_ALGORITHM {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let Ok(expected) = STANDARD.decode(expected) else {
        return false;
    };
    let actual = derive(password, salt, iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// Returns the API token of `account`, creating one on first use.
pub async fn issue_token(store: &dyn AccountStore, account: &Account) -> Result<String, StoreError> {
    if let Some(token) = store.token_for_account(account.id).await? {
        return Ok(token);
    }
    let token = generate_token();
    store.save_token(account.id, &token).await?;
    tracing::info!(username = %account.username, "issued api token");
    Ok(token)
}

/// Looks `username` up and checks `password`; inactive accounts never authenticate.
pub async fn authenticate(
    store: &dyn AccountStore,
    username: &str,
    password: &str,
) -> Result<Option<Account>, StoreError> {
    let Some(account) = store.account_by_username(username).await? else {
        return Ok(None);
    };
    if !account.is_active {
        return Ok(None);
    }
    // PBKDF2 at full strength takes hundreds of milliseconds; keep it off the runtime.
    let encoded = account.password_hash.clone();
    let password = password.to_string();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| StoreError::Internal(format!("password check failed: {}", e)))?;
    Ok(matches.then_some(account))
}
