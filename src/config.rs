//! Server configuration from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::utils::get_database_path;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Credentials and endpoints of the OAuth application used for cloud storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub api_url: String,
    pub content_url: String,
    /// Remote folder under which attachments are stored
    pub folder: String,
}

impl CloudConfig {
    /// Configuration against the public provider endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: "http://127.0.0.1:5000/cloud/callback".into(),
            authorize_url: "https://www.dropbox.com/oauth2/authorize".into(),
            api_url: "https://api.dropboxapi.com".into(),
            content_url: "https://content.dropboxapi.com".into(),
            folder: "/reminote".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub database: PathBuf,
    /// Translation table file; the embedded table is used when unset
    pub translations: Option<PathBuf>,
    pub default_lang: String,
    pub notify_interval: std::time::Duration,
    pub session_ttl: time::Duration,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
    /// `None` disables attachments and the cloud routes
    pub cloud: Option<CloudConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            database: PathBuf::from("notes.db"),
            translations: None,
            default_lang: "pt".into(),
            notify_interval: std::time::Duration::from_secs(30),
            session_ttl: crate::session::DEFAULT_SESSION_TTL,
            secure_cookies: false,
            max_upload_bytes: 25 * 1024 * 1024,
            cloud: None,
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("Failed to read .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let database = match var("REMINOTE_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => get_database_path()?,
        };

        let notify_secs: u64 = try_load(&var, "REMINOTE_NOTIFY_INTERVAL_SECS", "30")?;
        if notify_secs == 0 {
            return Err(anyhow!("REMINOTE_NOTIFY_INTERVAL_SECS must be positive"));
        }

        let ttl_hours: i64 = try_load(&var, "REMINOTE_SESSION_TTL_HOURS", "336")?;
        if ttl_hours <= 0 {
            return Err(anyhow!("REMINOTE_SESSION_TTL_HOURS must be positive"));
        }

        let cloud = match (var("CLOUD_CLIENT_ID"), var("CLOUD_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => {
                let base = CloudConfig::new(id, secret);
                Some(CloudConfig {
                    redirect_uri: var("CLOUD_REDIRECT_URI").unwrap_or(base.redirect_uri.clone()),
                    authorize_url: var("CLOUD_AUTHORIZE_URL")
                        .unwrap_or(base.authorize_url.clone()),
                    api_url: var("CLOUD_API_URL").unwrap_or(base.api_url.clone()),
                    content_url: var("CLOUD_CONTENT_URL").unwrap_or(base.content_url.clone()),
                    folder: var("CLOUD_FOLDER").unwrap_or(base.folder.clone()),
                    ..base
                })
            }
            _ => {
                info!("CLOUD_CLIENT_ID/CLOUD_CLIENT_SECRET not set, attachments disabled");
                None
            }
        };

        Ok(Self {
            bind: try_load(&var, "REMINOTE_BIND", DEFAULT_BIND)?,
            database,
            translations: var("REMINOTE_TRANSLATIONS").map(PathBuf::from),
            default_lang: var("REMINOTE_DEFAULT_LANG").unwrap_or(defaults.default_lang),
            notify_interval: std::time::Duration::from_secs(notify_secs),
            session_ttl: time::Duration::hours(ttl_hours),
            secure_cookies: try_load(&var, "REMINOTE_SECURE_COOKIES", "false")?,
            max_upload_bytes: try_load(&var, "REMINOTE_MAX_UPLOAD_BYTES", "26214400")?,
            cloud,
        })
    }
}

fn try_load<T: FromStr>(var: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
