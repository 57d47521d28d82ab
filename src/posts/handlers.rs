use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::posts::dto::{CreatePostRequest, PostResponse, UpdatePostRequest};
use crate::posts::repo::PostError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", put(update_post).delete(delete_post))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
) -> Result<Json<Vec<PostResponse>>, (StatusCode, String)> {
    let posts = state.posts.fetch_all().await.map_err(post_error)?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), (StatusCode, String)> {
    if body.body.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "body must be non-empty".into()));
    }
    let post = state.posts.save(&body.body).await.map_err(post_error)?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[instrument(skip(state, body))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, (StatusCode, String)> {
    if body.body.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "body must be non-empty".into()));
    }
    let Some(mut post) = state.posts.fetch(id).await.map_err(post_error)? else {
        return Err((StatusCode::NOT_FOUND, "Post not found".into()));
    };
    post.body = body.body;
    let updated = state.posts.update(&post).await.map_err(post_error)?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(post) = state.posts.fetch(id).await.map_err(post_error)? else {
        return Err((StatusCode::NOT_FOUND, "Post not found".into()));
    };
    state.posts.delete(&post).await.map_err(post_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn post_error(e: PostError) -> (StatusCode, String) {
    error!(error = %e, "post operation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
