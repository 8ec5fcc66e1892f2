use axum::{
    async_trait,
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::dto::SessionIdBody;
use super::sessions::Identity;
use crate::{config::AuthMode, error::ApiError, state::AppState};

pub const AUTH_REQUIRED: &str = "Authentication required";
pub const INVALID_SESSION: &str = "Invalid session";

const MAX_AUTH_BODY: usize = 1024 * 1024;

/// The admin resolved by [`require_auth`].
pub struct CurrentAdmin(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentAdmin)
            .ok_or(ApiError::Unauthorized(AUTH_REQUIRED))
    }
}

/// Route layer guarding every protected endpoint.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (token, mut req) = take_token(req).await;
    let Some(token) = token else {
        warn!(uri = %req.uri(), "request without session token");
        return Err(ApiError::Unauthorized(AUTH_REQUIRED));
    };

    let identity = match state.config.auth_mode {
        AuthMode::Mock => Identity::mock(),
        AuthMode::Session => match state.sessions.lookup(&token).await? {
            Some(identity) => identity,
            None => {
                warn!(uri = %req.uri(), "unknown or expired session token");
                return Err(ApiError::Unauthorized(INVALID_SESSION));
            }
        },
    };
    debug!(admin = %identity.username, "session resolved");

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Token from the `Authorization` header, else from a `sessionId` field of a
/// JSON body. The body is buffered and put back into the returned request; an
/// unreadable or oversized body yields no token.
pub(crate) async fn take_token(req: Request) -> (Option<String>, Request) {
    if let Some(token) = token_from_headers(req.headers()) {
        return (Some(token), req);
    }

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_AUTH_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "unreadable request body, no session token");
            return (None, Request::from_parts(parts, Body::empty()));
        }
    };
    let token = serde_json::from_slice::<SessionIdBody>(&bytes)
        .ok()
        .and_then(|b| b.session_id)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    (token, Request::from_parts(parts, Body::from(bytes)))
}

/// Accepts `Bearer <token>` as well as the bare token as the header value.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if raw.eq_ignore_ascii_case("bearer") => "",
        _ => raw,
    };
    (!token.is_empty()).then(|| token.to_string())
}
