use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod sessions;

/// Routes reachable without a session.
pub fn public_router() -> Router<AppState> {
    handlers::public_routes()
}

/// Routes that sit behind [`extractors::require_auth`].
pub fn protected_router() -> Router<AppState> {
    handlers::protected_routes()
}
