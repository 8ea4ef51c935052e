/// Cloud storage integration.
///
/// Links a user's storage account through the OAuth2 authorization-code flow
/// and keeps its access token fresh for the attachment service.
mod accounts;
mod client;

pub use accounts::{CloudAccount, CloudAccounts, STATE_TTL};
pub use client::{StorageClient, StorageError, TokenGrant, UploadedFile};

use serde::Serialize;
use time::Duration;

use crate::config::CloudConfig;
use crate::{Error, Result, UserId};

/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Connection state reported to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudStatus {
    pub connected: bool,
    pub account_id: Option<String>,
}

#[derive(Clone)]
pub struct CloudService {
    client: StorageClient,
    accounts: CloudAccounts,
    folder: String,
}

impl CloudService {
    pub fn new(config: &CloudConfig, accounts: CloudAccounts) -> Result<Self> {
        Ok(Self {
            client: StorageClient::new(config)?,
            accounts,
            folder: config.folder.trim_end_matches('/').to_string(),
        })
    }

    pub fn client(&self) -> &StorageClient {
        &self.client
    }

    /// Remote folder uploads go under, without a trailing slash.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Starts the authorization flow, returning the provider URL to send the
    /// browser to.
    pub fn begin_connect(&self, user_id: UserId) -> Result<String> {
        let state = self.accounts.create_state(user_id)?;
        Ok(self.client.authorize_url(&state))
    }

    /// Finishes the authorization flow started by [`begin_connect`].
    ///
    /// # Errors
    ///
    /// `Validation` when `state` is unknown, stale or was issued to another
    /// user.
    ///
    /// [`begin_connect`]: CloudService::begin_connect
    pub async fn complete_connect(
        &self,
        user_id: UserId,
        code: &str,
        state: &str,
    ) -> Result<CloudAccount> {
        if !self.accounts.consume_state(state, user_id)? {
            return Err(Error::Validation("invalid OAuth state".into()));
        }

        let grant = self.client.exchange_code(code).await?;
        let account = self.accounts.save(user_id, &grant)?;
        tracing::info!(user_id = %user_id, "cloud storage account connected");
        Ok(account)
    }

    pub fn disconnect(&self, user_id: UserId) -> Result<bool> {
        self.accounts.delete(user_id)
    }

    pub fn status(&self, user_id: UserId) -> Result<CloudStatus> {
        let account = self.accounts.get(user_id)?;
        Ok(CloudStatus {
            connected: account.is_some(),
            account_id: account.and_then(|a| a.account_id),
        })
    }

    /// Returns a usable access token, refreshing it first when it is about
    /// to expire.
    ///
    /// # Errors
    ///
    /// `CloudNotConnected` when the user has no linked account.
    pub async fn access_token(&self, user_id: UserId) -> Result<String> {
        let account = self
            .accounts
            .get(user_id)?
            .ok_or(Error::CloudNotConnected)?;

        match account.refresh_token {
            Some(ref refresh) if account.expires_within(REFRESH_MARGIN) => {
                let grant = self.client.refresh(refresh).await?;
                let refreshed = self.accounts.save(user_id, &grant)?;
                tracing::debug!(user_id = %user_id, "refreshed cloud access token");
                Ok(refreshed.access_token)
            }
            _ => Ok(account.access_token),
        }
    }
}
