//! Server-side browser sessions keyed by an opaque cookie token.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use time::{Duration, OffsetDateTime};

use crate::db::{now_utc, timestamp_column};
use crate::utils::generate_token;
use crate::{Database, Result, TimezoneOffset, UserId};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "reminote_session";

/// Default session lifetime: two weeks.
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(24 * 14);

/// A browser session.
///
/// `user_id` is `None` for anonymous sessions, which exist only to remember
/// a language choice before login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Option<UserId>,
    pub lang: Option<String>,
    pub timezone_offset: Option<TimezoneOffset>,
    pub expires_at: OffsetDateTime,
}

/// Session persistence.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Database>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a new session with a fresh token.
    pub fn create(&self, user_id: Option<UserId>, lang: Option<&str>) -> Result<Session> {
        let now = now_utc();
        let session = Session {
            token: generate_token(),
            user_id,
            lang: lang.map(str::to_string),
            timezone_offset: None,
            expires_at: now + self.ttl,
        };

        self.db.connection().execute(
            "INSERT INTO sessions (token, user_id, lang, timezone_offset, created_at, expires_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            rusqlite::params![
                session.token,
                session.user_id,
                session.lang,
                now.unix_timestamp(),
                session.expires_at.unix_timestamp(),
            ],
        )?;

        Ok(session)
    }

    /// Loads a live session. Expired sessions are deleted and reported as absent.
    pub fn load(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.db.connection();
        let session = conn
            .query_row(
                "SELECT token, user_id, lang, timezone_offset, expires_at
                 FROM sessions WHERE token = ?1",
                [token],
                |row| {
                    let offset: Option<i64> = row.get(3)?;
                    Ok(Session {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        lang: row.get(2)?,
                        timezone_offset: offset.and_then(TimezoneOffset::new),
                        expires_at: timestamp_column(row, 4)?,
                    })
                },
            )
            .optional()?;

        match session {
            Some(s) if s.expires_at <= OffsetDateTime::now_utc() => {
                conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Stores the chosen language. Returns false if the session is gone.
    pub fn set_lang(&self, token: &str, lang: &str) -> Result<bool> {
        let updated = self.db.connection().execute(
            "UPDATE sessions SET lang = ?2 WHERE token = ?1",
            (token, lang),
        )?;
        Ok(updated > 0)
    }

    /// Stores the browser timezone offset. Returns false if the session is gone.
    pub fn set_timezone_offset(&self, token: &str, offset: TimezoneOffset) -> Result<bool> {
        let updated = self.db.connection().execute(
            "UPDATE sessions SET timezone_offset = ?2 WHERE token = ?1",
            (token, offset.minutes()),
        )?;
        Ok(updated > 0)
    }

    pub fn delete(&self, token: &str) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(())
    }

    /// Removes every expired session, returning how many were dropped.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.db.connection().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [OffsetDateTime::now_utc().unix_timestamp()],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserService;

    fn setup() -> (SessionStore, UserId) {
        let db = Arc::new(Database::in_memory().expect("failed to create in-memory database"));
        let user = UserService::new(db.clone()).register("ana", "pw").unwrap();
        (SessionStore::new(db, DEFAULT_SESSION_TTL), user.id)
    }

    #[test]
    fn create_and_load_round_trip() {
        let (sessions, user_id) = setup();
        let session = sessions.create(Some(user_id), Some("en")).unwrap();

        let loaded = sessions.load(&session.token).unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.user_id, Some(user_id));
        assert_eq!(loaded.lang.as_deref(), Some("en"));
        assert_eq!(loaded.timezone_offset, None);
    }

    #[test]
    fn unknown_token_is_absent() {
        let (sessions, _) = setup();
        assert_eq!(sessions.load("missing").unwrap(), None);
    }

    #[test]
    fn anonymous_sessions_are_allowed() {
        let (sessions, _) = setup();
        let session = sessions.create(None, Some("pt")).unwrap();
        let loaded = sessions.load(&session.token).unwrap().unwrap();
        assert_eq!(loaded.user_id, None);
    }

    #[test]
    fn expired_sessions_are_dropped_on_load() {
        let db = Arc::new(Database::in_memory().unwrap());
        let sessions = SessionStore::new(db.clone(), Duration::seconds(-1));
        let session = sessions.create(None, None).unwrap();

        assert_eq!(sessions.load(&session.token).unwrap(), None);

        let remaining: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn purge_removes_only_expired() {
        let db = Arc::new(Database::in_memory().unwrap());
        let expired = SessionStore::new(db.clone(), Duration::seconds(-1));
        let live = SessionStore::new(db.clone(), DEFAULT_SESSION_TTL);

        expired.create(None, None).unwrap();
        expired.create(None, None).unwrap();
        let keep = live.create(None, None).unwrap();

        assert_eq!(live.purge_expired().unwrap(), 2);
        assert!(live.load(&keep.token).unwrap().is_some());
    }

    #[test]
    fn preferences_are_persisted() {
        let (sessions, user_id) = setup();
        let session = sessions.create(Some(user_id), None).unwrap();

        assert!(sessions.set_lang(&session.token, "en").unwrap());
        assert!(
            sessions
                .set_timezone_offset(&session.token, TimezoneOffset::new(180).unwrap())
                .unwrap()
        );

        let loaded = sessions.load(&session.token).unwrap().unwrap();
        assert_eq!(loaded.lang.as_deref(), Some("en"));
        assert_eq!(loaded.timezone_offset.map(|o| o.minutes()), Some(180));
    }

    #[test]
    fn updates_on_deleted_session_report_false() {
        let (sessions, _) = setup();
        let session = sessions.create(None, None).unwrap();
        sessions.delete(&session.token).unwrap();

        assert!(!sessions.set_lang(&session.token, "en").unwrap());
        assert_eq!(sessions.load(&session.token).unwrap(), None);
    }

    #[test]
    fn deleting_user_ends_their_sessions() {
        let db = Arc::new(Database::in_memory().unwrap());
        let user = UserService::new(db.clone()).register("ana", "pw").unwrap();
        let sessions = SessionStore::new(db.clone(), DEFAULT_SESSION_TTL);
        let session = sessions.create(Some(user.id), None).unwrap();

        db.connection()
            .execute("DELETE FROM users WHERE id = ?1", [user.id])
            .unwrap();

        assert_eq!(sessions.load(&session.token).unwrap(), None);
    }
}
