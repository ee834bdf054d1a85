use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{LikeChange, LikeStatus};
use super::services;
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/likes", get(get_likes))
        .route("/posts/:id/like", put(like).delete(unlike))
        .route("/posts/:id/like/toggle", post(toggle_like))
}

#[instrument(skip(state))]
pub async fn get_likes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeStatus>, AppError> {
    services::status(&state, id, user_id).await.map(Json)
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeChange>, AppError> {
    services::toggle(&state, id, user_id).await.map(Json)
}

#[instrument(skip(state))]
pub async fn like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeChange>, AppError> {
    services::set(&state, id, user_id, true).await.map(Json)
}

#[instrument(skip(state))]
pub async fn unlike(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeChange>, AppError> {
    services::set(&state, id, user_id, false).await.map(Json)
}
