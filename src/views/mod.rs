pub mod controller;
pub mod handlers;
pub mod sessions;
pub mod store;
pub mod templates;

use crate::state::AppState;
use axum::Router;

pub use controller::ViewServices;
pub use sessions::ViewSessions;
pub use templates::FsTemplateSource;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
