use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::repo_types::{Client, ClientPatch};
use crate::{auth::jwt::AdminUser, error::reject, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clientes", get(list_clients).post(create_client))
        .route(
            "/clientes/:id",
            get(get_client).put(update_client).delete(deactivate_client),
        )
        .route("/clientes/:id/reactivar", post(reactivate_client))
        .route("/clientes/:id/purgar", post(purge_client))
}

#[instrument(skip(state))]
pub async fn list_clients(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<Vec<Client>>, (StatusCode, String)> {
    state.clients.list().await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn get_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Client>, (StatusCode, String)> {
    state.clients.get(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn create_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<Client>,
) -> Result<(StatusCode, Json<Client>), (StatusCode, String)> {
    let saved = state.clients.save(payload).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(state, patch))]
pub async fn update_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<ClientPatch>,
) -> Result<Json<Client>, (StatusCode, String)> {
    state.clients.update(&id, patch).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn deactivate_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Client>, (StatusCode, String)> {
    state.clients.delete(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn reactivate_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Client>, (StatusCode, String)> {
    state.clients.reactivate(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn purge_client(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.clients.purge(&id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
