use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::repo_types::{Concept, ConceptBook};
use crate::{auth::jwt::AdminUser, error::reject, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conceptos", get(list_concepts).post(create_concept))
        .route("/conceptos/libro", get(concept_book))
        .route(
            "/conceptos/:id",
            get(get_concept).put(update_concept).delete(delete_concept),
        )
}

#[instrument(skip(state))]
pub async fn list_concepts(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<Vec<Concept>>, (StatusCode, String)> {
    state.concepts.list().await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn concept_book(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<ConceptBook>, (StatusCode, String)> {
    state.concepts.book().await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn get_concept(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Concept>, (StatusCode, String)> {
    state.concepts.get(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn create_concept(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<Concept>,
) -> Result<(StatusCode, Json<Concept>), (StatusCode, String)> {
    let saved = state.concepts.save(payload).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(state, payload))]
pub async fn update_concept(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<Concept>,
) -> Result<Json<Concept>, (StatusCode, String)> {
    state.concepts.update(&id, payload).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn delete_concept(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.concepts.delete(&id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
