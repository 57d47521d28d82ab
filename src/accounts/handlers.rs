use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::accounts::dto::{AccountResponse, CreateAccountRequest, UpdateAccountRequest};
use crate::accounts::repo::{AccountError, AccountRepository};
use crate::auth::AuthUser;
use crate::identity::FixedIdentity;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route(
            "/accounts/me",
            get(my_account).put(update_account).delete(delete_account),
        )
}

/// Account repository scoped to the request's verified identity.
fn repo_for(state: &AppState, identity: Uuid) -> AccountRepository {
    AccountRepository::new(state.store.clone(), Arc::new(FixedIdentity(Some(identity))))
}

#[instrument(skip(state, body))]
pub async fn create_account(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), (StatusCode, String)> {
    if body.username.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "username must be non-empty".into()));
    }
    let account = repo_for(&state, identity)
        .create_account(body.username.trim())
        .await
        .map_err(account_error)?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

#[instrument(skip(state))]
pub async fn my_account(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<AccountResponse>, (StatusCode, String)> {
    let account = repo_for(&state, identity)
        .fetch_account()
        .await
        .map_err(not_found_or_error)?;
    Ok(Json(account.into()))
}

#[instrument(skip(state, body))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, (StatusCode, String)> {
    let repo = repo_for(&state, identity);
    let mut account = repo.fetch_account().await.map_err(not_found_or_error)?;
    if let Some(username) = body.username {
        if username.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "username must be non-empty".into()));
        }
        account.username = username.trim().to_string();
    }
    if let Some(bio) = body.bio {
        account.bio = bio;
    }
    let updated = repo.update_account(&account).await.map_err(account_error)?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    let repo = repo_for(&state, identity);
    let account = repo.fetch_account().await.map_err(not_found_or_error)?;
    repo.delete_account(&account).await.map_err(account_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// A failed lookup means the caller has no account yet.
fn not_found_or_error(e: AccountError) -> (StatusCode, String) {
    match e {
        AccountError::Decode => (StatusCode::NOT_FOUND, "Account not found".into()),
        other => account_error(other),
    }
}

fn account_error(e: AccountError) -> (StatusCode, String) {
    match e {
        AccountError::NoIdentity => (StatusCode::UNAUTHORIZED, e.to_string()),
        other => {
            error!(error = %other, "account operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}
