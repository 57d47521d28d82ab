use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::auth::dto::TokenResponse;
use crate::auth::jwt::JwtKeys;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/token", post(issue_token))
}

/// Mint a fresh platform identity and its access token. Stands in for the
/// device-level sign-in the hosted platform would normally provide.
#[instrument(skip(state))]
pub async fn issue_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let identity_id = Uuid::new_v4();
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(identity_id).map_err(|e| {
        error!(error = %e, "token signing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    info!(%identity_id, "issued identity token");
    Ok(Json(TokenResponse {
        identity_id,
        access_token,
    }))
}
