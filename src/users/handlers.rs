use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateUserRequest, PublicUser, UserPatch};
use crate::{auth::jwt::AdminUser, error::reject, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/usuarios", get(list_users).post(create_user))
        .route(
            "/usuarios/:id",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .route("/usuarios/:id/reactivar", post(reactivate_user))
        .route("/usuarios/:id/purgar", post(purge_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = state.users.list().await.map_err(reject)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state.users.get(&id).await.map_err(reject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = state.users.save(payload.into()).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, patch))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state.users.update(&id, patch).await.map_err(reject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state.users.delete(&id).await.map_err(reject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn reactivate_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state.users.reactivate(&id).await.map_err(reject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn purge_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.users.purge(&id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
