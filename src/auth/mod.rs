use crate::state::AppState;
use axum::Router;

pub mod accounts;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;
pub mod session;

pub use services::AuthFlow;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
