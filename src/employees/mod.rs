pub mod dto;
pub mod handlers;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::{Employee, EmployeeStatus};
pub use services::EmployeeService;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
