use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreatePostRequest, FeedQuery, PostView};
use super::services;
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    services::feed(&state, user_id, &q).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostView>, AppError> {
    services::get(&state, user_id, id).await.map(Json)
}

/// POST /posts { content }
#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, HeaderMap, Json<PostView>), AppError> {
    let post = services::create(&state, user_id, &payload.content).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/posts/{}", post.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(post)))
}
