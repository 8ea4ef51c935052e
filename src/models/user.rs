use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::UserId;

/// A registered account. The password hash never leaves the users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
