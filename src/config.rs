//! Configuration for a garden server.
//!
//! A [`GardenConfig`] is built once at startup from environment variables (optionally
//! loaded from a `.env` file) and then handed to the application state.  Command-line
//! flags of `gardend` override individual values after loading.

use std::path::PathBuf;

use tracing::{debug, info};

/// Values accepted as "true" for boolean variables.
const TRUTHS: &[&str] = &["True", "true", "1"];

/// Longest accepted session lifetime, about ten years.
pub const MAX_SESSION_DAYS: i64 = 3650;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to something that does not parse.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GardenConfig {
    /// PostgreSQL connection string; `None` means no database is configured.
    pub database_url: Option<String>,
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL used in hyperlinks when a request carries no `Host` header.
    pub public_url: Option<String>,
    /// Root directory of the filesystem object store.
    pub media_root: PathBuf,
    /// Bucket that receives uploaded images.
    pub image_bucket: String,
    /// Base URL of the object store; objects resolve to `<base>/<bucket>/<key>`.
    pub object_base_url: Option<String>,
    /// Buckets served to anyone under `/media/`.
    pub public_buckets: Vec<String>,
    /// Ensure every bucket exists at startup.
    pub consistency_check: bool,
    /// Lifetime of login sessions in days.
    pub session_days: i64,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_url: None,
            media_root: PathBuf::from("media"),
            image_bucket: "images".to_string(),
            object_base_url: None,
            public_buckets: vec!["images".to_string()],
            consistency_check: false,
            session_days: 14,
        }
    }
}

impl GardenConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "loaded environment file"),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => debug!(error = %e, "ignoring unreadable .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let database_url = get("DATABASE_URL").or_else(|| postgres_url(&get));
        let host = get("GARDEN_HOST").unwrap_or(defaults.host);
        let port = match get("GARDEN_PORT") {
            Some(value) => parse("GARDEN_PORT", &value)?,
            None => defaults.port,
        };
        let session_days = match get("GARDEN_SESSION_DAYS") {
            Some(value) => {
                let days: i64 = parse("GARDEN_SESSION_DAYS", &value)?;
                if !(1..=MAX_SESSION_DAYS).contains(&days) {
                    return Err(invalid(
                        "GARDEN_SESSION_DAYS",
                        &value,
                        format!("must be between 1 and {}", MAX_SESSION_DAYS),
                    ));
                }
                days
            }
            None => defaults.session_days,
        };
        let image_bucket = get("MINIO_STORAGE_BUCKET_NAME").unwrap_or(defaults.image_bucket);
        let public_buckets = match get("MINIO_PUBLIC_BUCKETS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|bucket| !bucket.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![image_bucket.clone()],
        };

        Ok(Self {
            database_url,
            host,
            port,
            public_url: get("GARDEN_PUBLIC_URL").map(|url| url.trim_end_matches('/').to_string()),
            media_root: get("GARDEN_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            image_bucket,
            object_base_url: get("MINIO_API").map(|url| url.trim_end_matches('/').to_string()),
            public_buckets,
            consistency_check: get("MINIO_CONSISTENCY_CHECK_ON_START")
                .is_some_and(|value| TRUTHS.contains(&value.as_str())),
            session_days,
        })
    }

    /// Every bucket the server writes to or serves.
    pub fn buckets(&self) -> Vec<String> {
        let mut buckets = vec![self.image_bucket.clone()];
        for bucket in &self.public_buckets {
            if !buckets.contains(bucket) {
                buckets.push(bucket.clone());
            }
        }
        buckets
    }

    /// True when `bucket` may be served to anyone.
    pub fn is_public_bucket(&self, bucket: &str) -> bool {
        self.public_buckets.iter().any(|b| b == bucket)
    }

    /// URL of an object stored in the image bucket.
    ///
    /// With an object store base URL the object resolves there; otherwise it is served by
    /// this server under `<base>/media/`, where `base` may be empty for relative links.
    pub fn object_url(&self, base: &str, key: &str) -> String {
        match &self.object_base_url {
            Some(object_base) => format!("{}/{}/{}", object_base, self.image_bucket, key),
            None => format!("{}/media/{}/{}", base, self.image_bucket, key),
        }
    }

    /// The address to bind, as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn postgres_url(get: &impl Fn(&str) -> Option<String>) -> Option<String> {
    let database = get("POSTGRES_DB")?;
    let host = get("POSTGRES_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = get("POSTGRES_PORT").unwrap_or_else(|| "5432".to_string());
    let credentials = match (get("POSTGRES_USER"), get("POSTGRES_PASSWORD")) {
        (Some(user), Some(password)) => format!("{}:{}@", user, password),
        (Some(user), None) => format!("{}@", user),
        _ => String::new(),
    };
    Some(format!(
        "postgres://{}{}:{}/{}",
        credentials, host, port, database
    ))
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, e.to_string()))
}
