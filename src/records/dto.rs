use serde::{Deserialize, Serialize};

use super::repo_types::UserRecord;
use super::services::whatsapp_link;

/// Request body for creating or replacing a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub anniversary_date: Option<String>,
    pub mobile_number: Option<String>,
}

/// A user as returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub record: UserRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_link: Option<String>,
}

impl From<UserRecord> for UserView {
    fn from(record: UserRecord) -> Self {
        let whatsapp_link = record.mobile_number.as_deref().and_then(whatsapp_link);
        Self {
            record,
            whatsapp_link,
        }
    }
}

/// `GET /users` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    /// `DD/MM`
    pub dob: Option<String>,
    /// `DD/MM`
    pub anniversary: Option<String>,
}
