use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{FeedQuery, PostView};
use super::repo_types::PostFilter;
use crate::config::FeedConfig;
use crate::error::AppError;
use crate::likes::dto::LikeTally;
use crate::likes::services::{tally, Tallies};
use crate::state::AppState;

/// Trims the content and enforces the length limits.
pub(crate) fn validate_content(content: &str, cfg: &FeedConfig) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Post content cannot be empty".into()));
    }
    let len = content.chars().count();
    if len > cfg.max_post_length {
        warn!(len, max = cfg.max_post_length, "post too long");
        return Err(AppError::BadRequest(format!(
            "Post content exceeds {} characters",
            cfg.max_post_length
        )));
    }
    Ok(content.to_string())
}

pub(crate) fn post_filter(q: &FeedQuery, cfg: &FeedConfig) -> PostFilter {
    let max = cfg.max_page_size.max(1);
    PostFilter {
        author: q.author,
        limit: q.limit.unwrap_or(cfg.page_size).clamp(1, max),
        offset: q.offset.max(0),
    }
}

pub(crate) async fn feed(
    state: &AppState,
    viewer: Uuid,
    q: &FeedQuery,
) -> Result<Vec<PostView>, AppError> {
    let filter = post_filter(q, &state.config.feed);
    let posts = state.store.list_posts(filter).await?;

    let ids: Vec<Uuid> = posts.iter().map(|p| p.post.id).collect();
    let tallies = Tallies::load(state, &ids, Some(viewer)).await;

    Ok(posts
        .into_iter()
        .map(|p| {
            let likes = tallies.get(p.post.id);
            PostView::new(p, likes)
        })
        .collect())
}

pub(crate) async fn get(
    state: &AppState,
    viewer: Uuid,
    post_id: Uuid,
) -> Result<PostView, AppError> {
    let post = state
        .store
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    let likes = tally(state, post_id, viewer).await;
    Ok(PostView::new(post, likes))
}

pub(crate) async fn create(
    state: &AppState,
    author: Uuid,
    content: &str,
) -> Result<PostView, AppError> {
    let content = validate_content(content, &state.config.feed)?;
    let post = state.store.insert_post(author, &content).await?;
    info!(post_id = %post.post.id, user_id = %author, "post created");
    Ok(PostView::new(post, LikeTally::Known { count: 0, liked: false }))
}
