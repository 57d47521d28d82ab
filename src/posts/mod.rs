mod dto;
pub mod handlers;
mod model;
mod repo;

use axum::Router;

use crate::state::AppState;

pub use model::Post;
pub use repo::{PostError, PostRepository};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
