use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{LikeChange, LikeStatus, LikeTally};
use super::repo_types::LikeStats;
use crate::error::AppError;
use crate::state::AppState;

/// Batch of tallies for a feed page. A failed lookup leaves every post
/// `Unavailable` instead of failing the page.
pub(crate) struct Tallies(Option<HashMap<Uuid, LikeStats>>);

impl Tallies {
    pub(crate) async fn load(state: &AppState, post_ids: &[Uuid], viewer: Option<Uuid>) -> Self {
        match state.store.like_stats(post_ids, viewer).await {
            Ok(map) => Tallies(Some(map)),
            Err(e) => {
                warn!(error = %e, posts = post_ids.len(), "like stats lookup failed");
                Tallies(None)
            }
        }
    }

    pub(crate) fn get(&self, post_id: Uuid) -> LikeTally {
        match &self.0 {
            Some(map) => map.get(&post_id).copied().unwrap_or_default().into(),
            None => LikeTally::Unavailable,
        }
    }
}

/// Count and viewer flag for one post; failures become `Unavailable`.
pub(crate) async fn tally(state: &AppState, post_id: Uuid, viewer: Uuid) -> LikeTally {
    let count = state.store.count_likes(post_id).await;
    let liked = state.store.is_liked(post_id, viewer).await;
    match (count, liked) {
        (Ok(count), Ok(liked)) => LikeTally::Known { count, liked },
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, %post_id, "like lookup failed");
            LikeTally::Unavailable
        }
    }
}

async fn ensure_post(state: &AppState, post_id: Uuid) -> Result<(), AppError> {
    match state.store.get_post(post_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("post")),
    }
}

pub(crate) async fn status(
    state: &AppState,
    post_id: Uuid,
    viewer: Uuid,
) -> Result<LikeStatus, AppError> {
    ensure_post(state, post_id).await?;
    Ok(LikeStatus {
        post_id,
        likes: tally(state, post_id, viewer).await,
    })
}

pub(crate) async fn toggle(
    state: &AppState,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<LikeChange, AppError> {
    let liked = state.store.toggle_like(post_id, user_id).await?;
    info!(%post_id, %user_id, liked, "like toggled");
    Ok(LikeChange {
        post_id,
        liked,
        changed: true,
        likes: tally(state, post_id, user_id).await,
    })
}

/// Idempotent like / unlike.
pub(crate) async fn set(
    state: &AppState,
    post_id: Uuid,
    user_id: Uuid,
    liked: bool,
) -> Result<LikeChange, AppError> {
    let changed = if liked {
        state.store.add_like(post_id, user_id).await?.is_some()
    } else {
        ensure_post(state, post_id).await?;
        state.store.remove_like(post_id, user_id).await?
    };
    if changed {
        info!(%post_id, %user_id, liked, "like set");
    }
    Ok(LikeChange {
        post_id,
        liked,
        changed,
        likes: tally(state, post_id, user_id).await,
    })
}
