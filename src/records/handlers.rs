use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{ListQuery, UserInput, UserView},
    repo::Persistence,
    repo_types::UserFields,
    services::ListFilter,
};
use crate::{
    auth::extractors::CurrentAdmin,
    error::{ApiError, ApiResult, Envelope},
    state::AppState,
};

const USER_NOT_FOUND: &str = "User not found";
pub const EPHEMERAL_WARNING: &str =
    "Storage is ephemeral: this change is not persisted and will be lost on restart";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<Vec<UserView>>>> {
    let filter = ListFilter::from_query(&query)
        .ok_or_else(|| ApiError::BadRequest("Invalid date filter, expected DD/MM".into()))?;
    let users = filter.apply(state.records.list().await?);
    Ok(Json(Envelope::data(
        users.into_iter().map(UserView::from).collect(),
    )))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let id = parse_id(&id)?;
    let user = state
        .records
        .get(id)
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;
    Ok(Json(Envelope::data(user.into())))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<UserView>>)> {
    let fields = validated(payload)?;
    let user = state.records.create(fields).await?;
    info!(admin = %admin.username, user_id = user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(
            Envelope::data(user.into())
                .with_message("User created successfully")
                .with_warning(persistence_warning(&state)),
        ),
    ))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<String>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let id = parse_id(&id)?;
    // an unknown id wins over a bad body
    if state.records.get(id).await?.is_none() {
        return Err(ApiError::NotFound(USER_NOT_FOUND));
    }
    let fields = validated(payload)?;
    let user = state
        .records
        .update(id, fields)
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;
    info!(admin = %admin.username, user_id = id, "user updated");
    Ok(Json(
        Envelope::data(user.into())
            .with_message("User updated successfully")
            .with_warning(persistence_warning(&state)),
    ))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    let id = parse_id(&id)?;
    if !state.records.delete(id).await? {
        return Err(ApiError::NotFound(USER_NOT_FOUND));
    }
    info!(admin = %admin.username, user_id = id, "user deleted");
    Ok(Json(
        Envelope::message("User deleted successfully").with_warning(persistence_warning(&state)),
    ))
}

fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest("Invalid user id".into()))
}

fn validated(payload: Result<Json<UserInput>, JsonRejection>) -> ApiResult<UserFields> {
    let Json(input) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    UserFields::try_from(input).map_err(ApiError::Validation)
}

fn persistence_warning(state: &AppState) -> Option<String> {
    (state.records.persistence() == Persistence::Ephemeral).then(|| EPHEMERAL_WARNING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_id("1.5"), Err(ApiError::BadRequest(_))));
    }
}
