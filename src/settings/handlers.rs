use axum::{extract::State, http::StatusCode, routing::{get, put}, Json, Router};
use tracing::instrument;

use super::repo_types::{CompanyProfile, Configuration};
use crate::{auth::jwt::AdminUser, error::reject, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/configuracion", get(get_configuration).put(save_configuration))
        .route("/configuracion/empresa", put(save_company))
}

#[instrument(skip(state))]
pub async fn get_configuration(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<Configuration>, (StatusCode, String)> {
    state.settings.load().await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn save_configuration(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<Configuration>,
) -> Result<Json<Configuration>, (StatusCode, String)> {
    state.settings.save(payload).await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn save_company(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<CompanyProfile>,
) -> Result<Json<Configuration>, (StatusCode, String)> {
    state.settings.save_company(payload).await.map(Json).map_err(reject)
}
