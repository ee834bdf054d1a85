use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{NetworkQuery, UpdateProfileRequest};
use super::repo_types::{Profile, ProfileChanges};
use crate::{auth::AuthUser, error::AppError, state::AppState};

const MAX_NETWORK_PAGE: i64 = 100;

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_network))
        .route("/profiles/:id", get(get_profile))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, AppError> {
    let profile = state.store.get_profile(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "profile missing for authenticated user");
        AppError::NotFound("profile")
    })?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let changes = profile_changes(payload)?;
    let profile = state
        .store
        .update_profile(user_id, &changes)
        .await?
        .ok_or(AppError::NotFound("profile"))?;
    info!(%user_id, "profile updated");
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    state
        .store
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("profile"))
}

/// Other members, for the "my network" page.
#[instrument(skip(state))]
pub async fn list_network(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<NetworkQuery>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let limit = q.limit.clamp(1, MAX_NETWORK_PAGE);
    let profiles = state.store.list_profiles(Some(user_id), limit).await?;
    Ok(Json(profiles))
}

fn profile_changes(req: UpdateProfileRequest) -> Result<ProfileChanges, AppError> {
    let name = match req.name.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        other => other,
    };
    Ok(ProfileChanges {
        name,
        bio: req.bio.map(|b| b.trim().to_string()),
        avatar_url: req.avatar_url.map(|u| u.trim().to_string()),
    })
}
