mod dto;
pub mod handlers;
mod model;
mod repo;

use axum::Router;

use crate::state::AppState;

pub use model::Account;
pub use repo::{AccountError, AccountRepository};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
