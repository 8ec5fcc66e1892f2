use serde::{Deserialize, Serialize};

use crate::auth::sessions::Identity;

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub session_id: String,
    pub user: PublicAdmin,
}

/// Public part of the admin returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicAdmin {
    pub id: i64,
    pub username: String,
    pub role: String,
}

/// Response of `GET /auth/check`.
#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub success: bool,
    pub user: Identity,
}

/// Token carried in a JSON body instead of the `Authorization` header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionIdBody {
    pub session_id: Option<String>,
}
