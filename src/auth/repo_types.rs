use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Operator allowed to sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string. Empty for legacy plaintext entries, which never verify.
    #[serde(default)]
    pub password_hash: String,
    pub role: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl AdminRecord {
    pub fn has_password_hash(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

/// Admin to be inserted by the seeder; the directory assigns the id.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}
