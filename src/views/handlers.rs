use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::controller::ViewOutcome;
use super::store::Snapshot;
use crate::{auth::jwt::AdminUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/views", get(landing_view))
        .route("/views/:name", get(render_view))
        .route("/estado", get(current_snapshot))
}

async fn show(state: &AppState, admin: Option<AdminUser>, name: &str) -> ViewOutcome {
    match admin {
        Some(AdminUser(claims)) => state.views.for_client(&claims.sid).navigate(name).await,
        None => state.views.render(name).await,
    }
}

#[instrument(skip_all)]
pub async fn landing_view(State(state): State<AppState>, admin: Option<AdminUser>) -> Json<ViewOutcome> {
    Json(show(&state, admin, "").await)
}

/// Always 200: failures come back as the error panel with `source: "error"`.
/// Only a signed-in administrator's navigation updates a store.
#[instrument(skip(state, admin))]
pub async fn render_view(
    State(state): State<AppState>,
    admin: Option<AdminUser>,
    Path(name): Path<String>,
) -> Json<ViewOutcome> {
    Json(show(&state, admin, &name).await)
}

pub async fn current_snapshot(State(state): State<AppState>, AdminUser(claims): AdminUser) -> Json<Snapshot> {
    Json(Snapshot::clone(&state.views.for_client(&claims.sid).store().snapshot()))
}
