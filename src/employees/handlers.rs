use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::EmployeePatch;
use super::repo_types::Employee;
use crate::{auth::jwt::AdminUser, error::reject, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/empleados", get(list_employees).post(create_employee))
        .route(
            "/empleados/:id",
            get(get_employee).put(update_employee).delete(deactivate_employee),
        )
        .route("/empleados/:id/reactivar", post(reactivate_employee))
        .route("/empleados/:id/purgar", post(purge_employee))
}

#[instrument(skip(state))]
pub async fn list_employees(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<Json<Vec<Employee>>, (StatusCode, String)> {
    state.employees.list().await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn get_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    state.employees.get(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn create_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(payload): Json<Employee>,
) -> Result<(StatusCode, Json<Employee>), (StatusCode, String)> {
    let saved = state.employees.save(payload).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(state, patch))]
pub async fn update_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    state.employees.update(&id, patch).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn deactivate_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    state.employees.delete(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn reactivate_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    state.employees.reactivate(&id).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn purge_employee(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.employees.purge(&id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
