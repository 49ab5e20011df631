use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use super::accounts::Registration;
use super::dto::{
    AnswerRequest, EmailRequest, LoginRequest, LoginResponse, MeResponse, QuestionResponse,
    RegisteredResponse, ResetRequest, SessionStatus,
};
use super::jwt::{AuthUser, JwtKeys};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/auth/register", post(register))
        .route("/auth/recuperar/pregunta", post(security_question))
        .route("/auth/recuperar/verificar", post(verify_answer))
        .route("/auth/recuperar/restablecer", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let (identity, session) = state
        .auth
        .login(&payload.email, &payload.password, payload.remember_me)
        .await
        .map_err(|e| e.reject())?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&identity, &session.sid).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor".to_string())
    })?;
    Ok(Json(LoginResponse { access_token, session }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    state.auth.logout(&claims.sid).await.map_err(|e| e.reject())?;
    state.views.forget(&claims.sid);
    Ok(StatusCode::NO_CONTENT)
}

/// Anonymous callers, and tokens whose session was closed, read as signed out.
#[instrument(skip_all)]
pub async fn session(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Result<Json<SessionStatus>, (StatusCode, String)> {
    let Some(AuthUser(claims)) = user else {
        return Ok(Json(SessionStatus { is_authenticated: false, session: None }));
    };
    let session = state.auth.current_session(&claims.sid).await.map_err(|e| e.reject())?;
    Ok(Json(SessionStatus { is_authenticated: session.is_some(), session }))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<RegisteredResponse>), (StatusCode, String)> {
    let account = state
        .auth
        .accounts()
        .register(payload)
        .await
        .map_err(|e| e.reject())?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse { id: account.id, email: account.email }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn security_question(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<QuestionResponse>, (StatusCode, String)> {
    let pregunta = state
        .auth
        .accounts()
        .security_question(&payload.email)
        .await
        .map_err(|e| e.reject())?;
    Ok(Json(QuestionResponse { pregunta }))
}

#[instrument(skip(state, payload))]
pub async fn verify_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .auth
        .accounts()
        .verify_answer(&payload.email, &payload.respuesta)
        .await
        .map_err(|e| e.reject())?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .auth
        .accounts()
        .reset_password(
            &payload.email,
            &payload.respuesta,
            &payload.new_password,
            &payload.confirm_new_password,
        )
        .await
        .map_err(|e| e.reject())?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse { id: claims.sub, email: claims.email, nombre: claims.name })
}
