mod app;
mod auth;
mod clients;
mod concepts;
mod config;
mod dates;
mod db;
mod employees;
mod error;
mod payslips;
mod seed;
mod settings;
mod state;
mod storage;
mod users;
mod validation;
mod views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "remuneraciones=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!("starting remuneraciones");
    let app_state = state::AppState::init().await?;
    if app_state.config.session_guard_disabled {
        tracing::warn!("session guard disabled; every session check reports authenticated");
    }

    let (host, port) = (app_state.config.host.clone(), app_state.config.port);
    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
