//! Account registration and password verification.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::OptionalExtension;

use crate::db::{is_unique_violation, now_utc, timestamp_column};
use crate::{Database, Error, Result, User, UserId};

/// Manages user accounts. Passwords are stored as Argon2id PHC strings.
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Registers a new account.
    ///
    /// The username is trimmed; usernames are unique ignoring case.
    ///
    /// # Errors
    ///
    /// - `Validation` when username or password is empty
    /// - `Conflict` when the username is taken
    pub fn register(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("Username cannot be empty".into()));
        }
        if password.is_empty() {
            return Err(Error::Validation("Password cannot be empty".into()));
        }

        let hash = hash_password(password)?;
        let now = now_utc();

        let conn = self.db.connection();
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            (username, &hash, now.unix_timestamp()),
        );

        match inserted {
            Ok(_) => Ok(User {
                id: UserId::new(conn.last_insert_rowid()),
                username: username.to_string(),
                created_at: now,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(Error::Conflict("Username already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks credentials and returns the matching user.
    ///
    /// Unknown usernames and wrong passwords both yield `Ok(None)`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let row = {
            let conn = self.db.connection();
            conn.query_row(
                "SELECT id, username, created_at, password_hash FROM users WHERE username = ?1",
                [username.trim()],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            created_at: timestamp_column(row, 2)?,
                        },
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?
        };

        match row {
            Some((user, hash)) if verify_password(password, &hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    /// Looks up a user by id.
    pub fn get(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.db.connection();
        let user = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: timestamp_column(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
