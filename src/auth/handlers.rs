use axum::{
    extract::{rejection::JsonRejection, Request, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthCheckResponse, LoginRequest, LoginResponse, PublicAdmin},
        extractors::{take_token, CurrentAdmin},
        password::{verify_against_decoy, verify_password},
        sessions::Identity,
    },
    error::{ApiError, ApiResult, Envelope},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/check", get(check))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (Some(username), Some(password)) = (
        payload.username.filter(|u| !u.is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    };

    let Some(admin) = state.admins.find_by_username(&username).await? else {
        verify_against_decoy(&password);
        warn!(%username, "login unknown username");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };

    if !admin.has_password_hash() {
        verify_against_decoy(&password);
        error!(%username, admin_id = admin.id, "admin has no password hash; run seed-admins");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    if !verify_password(&password, &admin.password_hash)? {
        warn!(%username, admin_id = admin.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    let now = OffsetDateTime::now_utc();
    if let Err(e) = state.admins.record_login(admin.id, now).await {
        error!(error = ?e, admin_id = admin.id, "failed to record last login");
    }

    let session_id = state
        .sessions
        .create(Identity {
            id: admin.id,
            username: admin.username.clone(),
            role: admin.role.clone(),
            login_time: now,
        })
        .await?;

    info!(admin_id = admin.id, %username, "admin logged in");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        session_id,
        user: PublicAdmin {
            id: admin.id,
            username: admin.username,
            role: admin.role,
        },
    }))
}

/// Revokes the presented token, if any. Always succeeds.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, req: Request) -> ApiResult<Json<Envelope<()>>> {
    let (token, _) = take_token(req).await;
    if let Some(token) = token {
        if state.sessions.revoke(&token).await? {
            info!("session revoked");
        }
    }
    Ok(Json(Envelope::message("Logout successful")))
}

#[instrument(skip_all)]
pub async fn check(CurrentAdmin(identity): CurrentAdmin) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        success: true,
        user: identity,
    })
}
