use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A managed person, as persisted by a record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, with = "iso_date::option")]
    pub dob: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub anniversary_date: Option<Date>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated mutable fields of a [`UserRecord`].
///
/// Only obtainable through `UserFields::try_from(UserInput)`, so a store never
/// sees a record without a name or without a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<Date>,
    pub anniversary_date: Option<Date>,
    pub mobile_number: Option<String>,
}

impl UserRecord {
    pub fn new(id: i64, fields: UserFields, now: OffsetDateTime) -> Self {
        Self {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            dob: fields.dob,
            anniversary_date: fields.anniversary_date,
            mobile_number: fields.mobile_number,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every mutable field; `id` and `created_at` are kept.
    pub fn apply(&mut self, fields: UserFields, now: OffsetDateTime) {
        self.first_name = fields.first_name;
        self.last_name = fields.last_name;
        self.dob = fields.dob;
        self.anniversary_date = fields.anniversary_date;
        self.mobile_number = fields.mobile_number;
        self.updated_at = now;
    }
}
