use std::net::SocketAddr;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, info, instrument, warn};

use crate::state::AppState;
use crate::{auth, clients, concepts, db, employees, payslips, settings, users, views};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(employees::router())
        .merge(clients::router())
        .merge(payslips::router())
        .merge(concepts::router())
        .merge(settings::router())
        .merge(views::router())
        .route("/health", get(|| async { "ok" }))
        .route("/ejemplo", get(ejemplo))
        .fallback(api_not_found)
}

pub fn build_app(state: AppState) -> Router {
    let public = state.config.public_dir.clone();
    let spa = ServeDir::new(&public).fallback(ServeFile::new(public.join("index.html")));

    Router::new()
        .nest("/api", api_router())
        .fallback_service(spa)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[instrument(skip(state))]
async fn ejemplo(State(state): State<AppState>) -> Result<Json<Vec<Value>>, (StatusCode, Json<Value>)> {
    match db::fetch_ejemplo(&state.pg).await {
        Ok(rows) => {
            info!(rows = rows.len(), "query on main ok");
            Ok(Json(rows))
        }
        Err(e) => {
            error!(error = %e, "query on main failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Error interno del servidor", "mensaje": "Algo salió mal" })),
            ))
        }
    }
}

async fn api_not_found(method: Method, OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    warn!(%method, %uri, "route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Ruta no encontrada", "ruta": uri.to_string() })),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use super::*;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn with_token(mut req: Request<Body>, token: &str) -> Request<Body> {
        req.headers_mut()
            .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        req
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = call(
            app,
            post_json("/api/auth/login", json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login {email}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    /// The administrator bootstrapped by the fake state.
    async fn sign_in_admin(app: &Router) -> String {
        login(app, "admin@empresa.cl", "admin-clave").await
    }

    /// A self-registered account, which is not an administrator.
    async fn sign_in_account(app: &Router) -> String {
        let (status, _) = call(
            app,
            post_json(
                "/api/auth/register",
                json!({
                    "firstName": "Carla",
                    "lastName": "Muñoz",
                    "email": "carla@empresa.cl",
                    "password": "clave-segura",
                    "confirmPassword": "clave-segura",
                    "securityQuestion": "first_pet",
                    "securityAnswer": "Firulais"
                }),
            ),
        )
        .await;
        assert!(status.is_success(), "register: {status}");
        login(app, "carla@empresa.cl", "clave-segura").await
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake().await);
        let res = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_api_route_is_json_404() {
        let app = build_app(AppState::fake().await);
        let (status, body) = call(&app, Request::get("/api/nada").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Ruta no encontrada");
        assert_eq!(body["ruta"], "/api/nada");
    }

    #[tokio::test]
    async fn data_routes_require_a_token() {
        let app = build_app(AppState::fake().await);
        let (status, _) = call(&app, Request::get("/api/empleados").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_then_list_seeded_employees() {
        let app = build_app(AppState::fake().await);
        let token = sign_in_admin(&app).await;

        let (status, body) = call(&app, get_with("/api/empleados", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = call(&app, get_with("/api/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "admin@empresa.cl");
    }

    #[tokio::test]
    async fn registered_accounts_cannot_reach_admin_routes() {
        let app = build_app(AppState::fake().await);
        let token = sign_in_account(&app).await;

        let req = with_token(
            post_json(
                "/api/usuarios",
                json!({
                    "nombre": "Evil", "apellido": "Doer", "rut": "18765432-7",
                    "email": "evil@empresa.cl", "user": "evil", "pass": "secreto1"
                }),
            ),
            &token,
        );
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, get_with("/api/empleados", &token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, get_with("/api/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "carla@empresa.cl");
    }

    #[tokio::test]
    async fn sessions_do_not_leak_between_clients() {
        let app = build_app(AppState::fake().await);
        let admin = sign_in_admin(&app).await;
        let carla = sign_in_account(&app).await;

        let (status, body) =
            call(&app, Request::get("/api/auth/session").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAuthenticated"], false);
        assert!(body.get("session").is_none());

        let (_, body) = call(&app, get_with("/api/auth/session", &admin)).await;
        assert_eq!(body["isAuthenticated"], true);
        assert_eq!(body["session"]["userEmail"], "admin@empresa.cl");

        let (status, _) = call(&app, Request::post("/api/auth/logout").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let logout = with_token(Request::post("/api/auth/logout").body(Body::empty()).unwrap(), &carla);
        let (status, _) = call(&app, logout).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, get_with("/api/me", &carla)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, body) = call(&app, get_with("/api/auth/session", &carla)).await;
        assert_eq!(body["isAuthenticated"], false);

        let (_, body) = call(&app, get_with("/api/auth/session", &admin)).await;
        assert_eq!(body["isAuthenticated"], true);
    }

    #[tokio::test]
    async fn anonymous_views_leave_an_admin_store_alone() {
        let app = build_app(AppState::fake().await);
        let admin = sign_in_admin(&app).await;

        let (status, body) = call(&app, get_with("/api/views/empleados", &admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "empleados");

        let (status, _) =
            call(&app, Request::get("/api/views/inicio").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, snapshot) = call(&app, get_with("/api/estado", &admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["currentView"], "empleados");
        assert_eq!(snapshot["employees"].as_array().unwrap().len(), 2);

        let (status, _) = call(&app, Request::get("/api/estado").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_generically() {
        let app = build_app(AppState::fake().await);
        sign_in_account(&app).await;
        let res = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                json!({ "email": "carla@empresa.cl", "password": "otra-clave" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let text = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&text[..], "Usuario o contraseña incorrectos".as_bytes());
    }

    #[tokio::test]
    async fn landing_view_is_served_inline() {
        let app = build_app(AppState::fake().await);
        let (status, body) = call(&app, Request::get("/api/views/inicio").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "inline");
        assert_eq!(body["title"], "Remuneraciones - Inicio");
    }

    #[tokio::test]
    async fn created_employee_shows_up() {
        let app = build_app(AppState::fake().await);
        let token = sign_in_admin(&app).await;

        let req = with_token(
            post_json(
                "/api/empleados",
                json!({
                    "rut": "76.543.210-3",
                    "nombres": "Pedro",
                    "apellidos": "Soto",
                    "sueldoBase": 900000
                }),
            ),
            &token,
        );
        let (status, created) = call(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, get_with(&format!("/api/empleados/{id}"), &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nombres"], "Pedro");
    }
}
