use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::repo_types::{format_currency, Payslip, PayslipTotals};
use crate::{
    auth::jwt::AdminUser, error::reject, state::AppState, storage::documents::PayslipFilter,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/liquidaciones", get(list_payslips).post(save_payslip))
        .route("/liquidaciones/borrador", post(draft_payslip))
        .route(
            "/liquidaciones/:id",
            get(get_payslip).put(replace_payslip).delete(delete_payslip),
        )
}

/// Payslip plus its totals already rendered as CLP.
#[derive(Debug, Serialize)]
pub struct PayslipView {
    #[serde(flatten)]
    pub payslip: Payslip,
    #[serde(rename = "formato")]
    pub formatted: FormattedTotals,
}

#[derive(Debug, Serialize)]
pub struct FormattedTotals {
    #[serde(rename = "totalHaberes")]
    pub earnings: String,
    #[serde(rename = "totalDescuentos")]
    pub deductions: String,
    #[serde(rename = "liquido")]
    pub net: String,
}

impl From<Payslip> for PayslipView {
    fn from(payslip: Payslip) -> Self {
        let PayslipTotals { earnings, deductions, net } = payslip.totals();
        Self {
            formatted: FormattedTotals {
                earnings: format_currency(earnings, 0),
                deductions: format_currency(deductions, 0),
                net: format_currency(net, 0),
            },
            payslip,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub empleado: String,
    pub periodo: String,
}

#[instrument(skip(state))]
pub async fn list_payslips(
    State(state): State<AppState>,
    _auth: AdminUser,
    Query(filter): Query<PayslipFilter>,
) -> Result<Json<Vec<PayslipView>>, (StatusCode, String)> {
    let list = state.payslips.list(&filter).await.map_err(reject)?;
    Ok(Json(list.into_iter().map(PayslipView::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_payslip(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<PayslipView>, (StatusCode, String)> {
    let p = state.payslips.get(id).await.map_err(reject)?;
    Ok(Json(p.into()))
}

#[instrument(skip(state, payload))]
pub async fn save_payslip(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(mut payload): Json<Payslip>,
) -> Result<(StatusCode, Json<PayslipView>), (StatusCode, String)> {
    payload.id = None;
    let saved = state.payslips.save(payload).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(saved.into())))
}

#[instrument(skip(state, payload))]
pub async fn replace_payslip(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<i64>,
    Json(mut payload): Json<Payslip>,
) -> Result<Json<PayslipView>, (StatusCode, String)> {
    state.payslips.get(id).await.map_err(reject)?;
    payload.id = Some(id);
    let saved = state.payslips.save(payload).await.map_err(reject)?;
    Ok(Json(saved.into()))
}

#[instrument(skip(state))]
pub async fn delete_payslip(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.payslips.delete(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn draft_payslip(
    State(state): State<AppState>,
    _auth: AdminUser,
    Json(req): Json<DraftRequest>,
) -> Result<Json<PayslipView>, (StatusCode, String)> {
    let book = state.concepts.book().await.map_err(reject)?;
    let draft = state
        .payslips
        .draft(&req.empleado, &req.periodo, &book)
        .await
        .map_err(reject)?;
    Ok(Json(draft.into()))
}
