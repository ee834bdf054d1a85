use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::likes::repo_types::{LikeStats, PostLike};
use crate::posts::repo_types::{PostFilter, PostWithAuthor};
use crate::profiles::repo_types::{Profile, ProfileChanges};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields needed to open an account: the user row and its profile.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub bio: Option<&'a str>,
}

/// Table access used by the handlers. `PgStore` is the real thing.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Creates the user and its profile together. Duplicate email is `Conflict`.
    async fn create_account(&self, account: NewAccount<'_>) -> StoreResult<(User, Profile)>;

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn list_profiles(&self, exclude: Option<Uuid>, limit: i64) -> StoreResult<Vec<Profile>>;
    /// Applies the set fields. An empty `bio` or `avatar_url` clears the column.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Profile>>;

    /// Newest first, authors attached.
    async fn list_posts(&self, filter: PostFilter) -> StoreResult<Vec<PostWithAuthor>>;
    async fn get_post(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>>;
    async fn insert_post(&self, user_id: Uuid, content: &str) -> StoreResult<PostWithAuthor>;

    /// Flips the like in one write and returns whether the post is now liked.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    /// Inserts the like unless present. `None` means it already existed.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<Option<PostLike>>;
    /// Removes the like. `false` means there was nothing to remove.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64>;
    async fn is_liked(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    /// Stats for many posts at once. Posts without likes may be absent.
    async fn like_stats(
        &self,
        post_ids: &[Uuid],
        viewer: Option<Uuid>,
    ) -> StoreResult<HashMap<Uuid, LikeStats>>;
}
