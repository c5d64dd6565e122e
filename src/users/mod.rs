pub mod dto;
pub mod handlers;
pub mod repo;
pub mod service;
pub(crate) mod validate;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
