//! Linked storage accounts and pending OAuth authorization states.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use time::{Duration, OffsetDateTime};

use super::client::TokenGrant;
use crate::db::{now_utc, optional_timestamp_column, timestamp_column};
use crate::utils::generate_token;
use crate::{Database, Result, UserId};

/// How long an authorization `state` stays valid.
pub const STATE_TTL: Duration = Duration::minutes(10);

/// Stored credentials for a user's storage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudAccount {
    pub user_id: UserId,
    pub account_id: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub connected_at: OffsetDateTime,
}

impl CloudAccount {
    /// True when the access token is gone or will be within `margin`.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at
            .is_some_and(|at| at <= OffsetDateTime::now_utc() + margin)
    }
}

#[derive(Clone)]
pub struct CloudAccounts {
    db: Arc<Database>,
}

impl CloudAccounts {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stores a token grant for `user_id`, replacing earlier tokens.
    ///
    /// Refresh grants usually omit the refresh token and account id; the
    /// stored ones are kept in that case.
    pub fn save(&self, user_id: UserId, grant: &TokenGrant) -> Result<CloudAccount> {
        let now = now_utc();
        let expires_at = grant.expires_in.map(|secs| now + Duration::seconds(secs));

        self.db.connection().execute(
            "INSERT INTO cloud_accounts (user_id, account_id, access_token, refresh_token, expires_at, connected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                 account_id = COALESCE(excluded.account_id, cloud_accounts.account_id),
                 access_token = excluded.access_token,
                 refresh_token = COALESCE(excluded.refresh_token, cloud_accounts.refresh_token),
                 expires_at = excluded.expires_at",
            rusqlite::params![
                user_id,
                grant.account_id,
                grant.access_token,
                grant.refresh_token,
                expires_at.map(OffsetDateTime::unix_timestamp),
                now.unix_timestamp(),
            ],
        )?;

        self.get(user_id)?
            .ok_or_else(|| crate::Error::NotFound(format!("cloud account of user {user_id}")))
    }

    pub fn get(&self, user_id: UserId) -> Result<Option<CloudAccount>> {
        let account = self
            .db
            .connection()
            .query_row(
                "SELECT user_id, account_id, access_token, refresh_token, expires_at, connected_at
                 FROM cloud_accounts WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(CloudAccount {
                        user_id: row.get(0)?,
                        account_id: row.get(1)?,
                        access_token: row.get(2)?,
                        refresh_token: row.get(3)?,
                        expires_at: optional_timestamp_column(row, 4)?,
                        connected_at: timestamp_column(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// Forgets the linked account. Returns false if none was linked.
    pub fn delete(&self, user_id: UserId) -> Result<bool> {
        let deleted = self
            .db
            .connection()
            .execute("DELETE FROM cloud_accounts WHERE user_id = ?1", [user_id])?;
        Ok(deleted > 0)
    }

    /// Records a fresh authorization state for `user_id`.
    ///
    /// States older than [`STATE_TTL`] are swept out at the same time.
    pub fn create_state(&self, user_id: UserId) -> Result<String> {
        let now = now_utc();
        let state = generate_token();

        let conn = self.db.connection();
        conn.execute(
            "DELETE FROM oauth_states WHERE created_at <= ?1",
            [(now - STATE_TTL).unix_timestamp()],
        )?;
        conn.execute(
            "INSERT INTO oauth_states (state, user_id, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![state, user_id, now.unix_timestamp()],
        )?;

        Ok(state)
    }

    /// Consumes `state`, returning whether it was issued to `user_id` within
    /// the last [`STATE_TTL`].
    ///
    /// A state is single-use: it is removed even when the check fails.
    pub fn consume_state(&self, state: &str, user_id: UserId) -> Result<bool> {
        let conn = self.db.connection();
        let row: Option<(UserId, i64)> = conn
            .query_row(
                "SELECT user_id, created_at FROM oauth_states WHERE state = ?1",
                [state],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        conn.execute("DELETE FROM oauth_states WHERE state = ?1", [state])?;

        let fresh_after = (OffsetDateTime::now_utc() - STATE_TTL).unix_timestamp();
        Ok(matches!(row, Some((owner, created)) if owner == user_id && created > fresh_after))
    }
}
