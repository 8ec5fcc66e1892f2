pub mod dto;
pub mod file_repo;
pub mod handlers;
pub mod pg_repo;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
