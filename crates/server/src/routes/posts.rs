use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::info;

use service::posts::{Post, PostInput};

use crate::{errors::ApiError, response::ApiResponse, state::ServerState};

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::new(axum::http::StatusCode::BAD_REQUEST, format!("Invalid post id: {raw}")))
}

pub async fn fetch_and_store(State(state): State<ServerState>) -> ApiResult<Vec<Post>> {
    let posts = state.posts.fetch_and_store().await.map_err(|e| state.reject(e))?;
    info!(count = posts.len(), "fetch and store posts");
    Ok(ApiResponse::created(posts, "Successfully fetched and stored posts."))
}

pub async fn list(State(state): State<ServerState>) -> ApiResult<Vec<Post>> {
    let posts = state.posts.get_all().await.map_err(|e| state.reject(e))?;
    info!(count = posts.len(), "list posts");
    Ok(ApiResponse::ok(posts, "Posts retrieved successfully."))
}

pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<PostInput>, JsonRejection>,
) -> ApiResult<Post> {
    let Json(input) = payload?;
    let post = state.posts.create(&input).await.map_err(|e| state.reject(e))?;
    info!(id = post.id, "created post");
    Ok(ApiResponse::created(post, "Post created successfully in both API and database."))
}

pub async fn get(State(state): State<ServerState>, Path(raw): Path<String>) -> ApiResult<Post> {
    let id = parse_id(&raw)?;
    let post = state.posts.get_by_id(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(post, "Post retrieved successfully."))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(raw): Path<String>,
    payload: Result<Json<PostInput>, JsonRejection>,
) -> ApiResult<Post> {
    let id = parse_id(&raw)?;
    let Json(input) = payload?;
    let updated = state.posts.update(id, &input).await.map_err(|e| state.reject(e))?;
    let message = if updated.remote.is_synced() {
        "Post updated successfully in both API and database."
    } else {
        "Post updated in database; remote update failed."
    };
    info!(id, remote_synced = updated.remote.is_synced(), "updated post");
    Ok(ApiResponse::ok(updated.post, message))
}

pub async fn delete(State(state): State<ServerState>, Path(raw): Path<String>) -> ApiResult<Post> {
    let id = parse_id(&raw)?;
    let post = state.posts.delete(id).await.map_err(|e| state.reject(e))?;
    info!(id, "deleted post");
    Ok(ApiResponse::ok(post, "Post deleted successfully from both API and database."))
}
