mod dto;
pub(crate) mod extractor;
pub mod handlers;
pub mod jwt;

use axum::Router;

use crate::state::AppState;

pub use extractor::AuthUser;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
