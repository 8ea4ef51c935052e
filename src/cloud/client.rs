/// HTTP client for the cloud storage provider.
///
/// Speaks the Dropbox HTTP API v2 wire protocol: OAuth2 code exchange and
/// refresh, content upload, file deletion and temporary download links.
use std::future::Future;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CloudConfig;

/// Errors that can occur when talking to the storage provider.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection failures, DNS resolution, timeouts
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-success HTTP status with the provider's error summary, if any
    #[error("HTTP error: status {status}: {summary}")]
    Http { status: u16, summary: String },

    /// The remote file does not exist
    #[error("remote file not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Only present on the initial exchange with offline access
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Metadata of a stored file as reported after upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: String,
    pub size: u64,
}

#[derive(Deserialize)]
struct FileMetadata {
    #[serde(default)]
    path_display: Option<String>,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct TemporaryLink {
    link: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

/// Client for one OAuth application registered with the provider.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    authorize_url: Url,
    api_url: Url,
    content_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl StorageClient {
    /// Builds a client from validated configuration.
    pub fn new(config: &CloudConfig) -> Result<Self, StorageError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| StorageError::InvalidUrl(format!("{raw}: {e}")))
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(StorageError::Network)?;

        Ok(Self {
            http,
            authorize_url: parse(&config.authorize_url)?,
            api_url: parse(&config.api_url)?,
            content_url: parse(&config.content_url)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// URL the browser is sent to in order to grant access.
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("token_access_type", "offline");
        url.to_string()
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, StorageError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
    }

    /// Obtains a fresh access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, StorageError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, StorageError> {
        let url = join(&self.api_url, "oauth2/token")?;
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(StorageError::Network)?;

        parse_json(check_status(response).await?).await
    }

    /// Uploads `bytes` to `path`. The provider renames on conflict, so the
    /// returned path may differ from the requested one.
    pub async fn upload(
        &self,
        access_token: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, StorageError> {
        let url = join(&self.content_url, "2/files/upload")?;
        let arg = ascii_json(&UploadArg {
            path,
            mode: "add",
            autorename: true,
            mute: true,
        })?;

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header("Dropbox-API-Arg", arg)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(StorageError::Network)?;

        let metadata: FileMetadata = parse_json(check_status(response).await?).await?;
        let stored_path = metadata
            .path_display
            .or(metadata.path_lower)
            .unwrap_or_else(|| path.to_string());

        Ok(UploadedFile {
            path: stored_path,
            size: metadata.size,
        })
    }

    /// Deletes the file at `path`.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when the provider reports the path missing.
    pub async fn delete(&self, access_token: &str, path: &str) -> Result<(), StorageError> {
        let url = &join(&self.api_url, "2/files/delete_v2")?;

        retry_with_backoff(move || async move {
            let response = self
                .http
                .post(url.clone())
                .bearer_auth(access_token)
                .json(&PathArg { path })
                .send()
                .await
                .map_err(StorageError::Network)?;

            match check_status(response).await {
                Ok(_) => Ok(()),
                Err(StorageError::Http { status: 409, summary })
                    if summary.contains("not_found") =>
                {
                    Err(StorageError::NotFound(path.to_string()))
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Returns a short-lived direct download link for `path`.
    pub async fn temporary_link(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<String, StorageError> {
        let url = &join(&self.api_url, "2/files/get_temporary_link")?;

        retry_with_backoff(move || async move {
            let response = self
                .http
                .post(url.clone())
                .bearer_auth(access_token)
                .json(&PathArg { path })
                .send()
                .await
                .map_err(StorageError::Network)?;

            match check_status(response).await {
                Ok(response) => parse_json::<TemporaryLink>(response).await.map(|l| l.link),
                Err(StorageError::Http { status: 409, summary })
                    if summary.contains("not_found") =>
                {
                    Err(StorageError::NotFound(path.to_string()))
                }
                Err(e) => Err(e),
            }
        })
        .await
    }
}

fn join(base: &Url, path: &str) -> Result<Url, StorageError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| StorageError::InvalidUrl(format!("{base}{path}: {e}")))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let summary = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_summary.or(b.error_description))
        .unwrap_or_else(|| body.chars().take(200).collect());

    Err(StorageError::Http {
        status: status.as_u16(),
        summary,
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StorageError> {
    let bytes = response.bytes().await.map_err(StorageError::Network)?;
    serde_json::from_slice(&bytes).map_err(StorageError::Serialization)
}

/// Serializes to JSON with every non-ASCII character escaped, as HTTP header
/// values must be ASCII.
fn ascii_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    let json = serde_json::to_string(value).map_err(StorageError::Serialization)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

/// Retries an operation on transient failures with exponential backoff.
///
/// Up to 3 retries with delays of 200ms, 400ms and 800ms. Client errors
/// (HTTP 4xx) and missing files are returned immediately.
async fn retry_with_backoff<F, Fut, T>(mut f: F) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    const DELAYS_MS: [u64; 3] = [200, 400, 800];

    let mut last_error = match f().await {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for delay in DELAYS_MS {
        tokio::time::sleep(Duration::from_millis(delay)).await;

        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "retrying storage request");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

fn should_retry(error: &StorageError) -> bool {
    match error {
        StorageError::Network(_) => true,
        StorageError::Http { status, .. } => {
            StatusCode::from_u16(*status).is_ok_and(|s| s.is_server_error())
        }
        StorageError::NotFound(_)
        | StorageError::Serialization(_)
        | StorageError::InvalidUrl(_) => false,
    }
}
