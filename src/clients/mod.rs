pub mod handlers;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::Client;
pub use services::ClientService;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
