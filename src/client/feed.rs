use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use super::{ClientError, Session};
use crate::likes::dto::{LikeChange, LikeStatus, LikeTally};
use crate::posts::dto::PostView;

/// The remote calls a `Feed` needs. `ApiClient` is the HTTP implementation.
#[async_trait]
pub trait FeedBackend: Send + Sync {
    async fn list_posts(
        &self,
        session: &Session,
        author: Option<Uuid>,
    ) -> Result<Vec<PostView>, ClientError>;
    async fn create_post(&self, session: &Session, content: &str) -> Result<PostView, ClientError>;
    async fn toggle_like(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeChange, ClientError>;
    async fn like_status(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeStatus, ClientError>;
}

/// Posts currently shown to the user, newest first, optionally limited to
/// one author (a profile page).
pub struct Feed<B> {
    backend: B,
    author: Option<Uuid>,
    posts: Vec<PostView>,
}

impl<B: FeedBackend> Feed<B> {
    pub fn new(backend: B, author: Option<Uuid>) -> Self {
        Self {
            backend,
            author,
            posts: Vec::new(),
        }
    }

    pub fn posts(&self) -> &[PostView] {
        &self.posts
    }

    pub fn author(&self) -> Option<Uuid> {
        self.author
    }

    /// Reloads the list. On failure the list is emptied and the error returned.
    pub async fn refresh(&mut self, session: &Session) -> Result<(), ClientError> {
        match self.backend.list_posts(session, self.author).await {
            Ok(posts) => {
                self.posts = posts;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to load posts");
                self.posts.clear();
                Err(e)
            }
        }
    }

    /// Publishes a post and puts it at the head of the list without a reload.
    /// Blank content never leaves the client.
    pub async fn create_post(
        &mut self,
        session: &Session,
        content: &str,
    ) -> Result<PostView, ClientError> {
        if content.trim().is_empty() {
            return Err(ClientError::EmptyContent);
        }
        let post = self.backend.create_post(session, content).await?;
        if self.author.map_or(true, |a| a == post.user_id) {
            self.posts.insert(0, post.clone());
        }
        Ok(post)
    }

    /// Flips the like, then reloads so every tally is current.
    pub async fn toggle_like(
        &mut self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeChange, ClientError> {
        let change = self.backend.toggle_like(session, post_id).await?;
        self.refresh(session).await?;
        Ok(change)
    }

    /// Point read of one post's likes; any failure reads as `Unavailable`.
    pub async fn like_tally(&self, session: &Session, post_id: Uuid) -> LikeTally {
        match self.backend.like_status(session, post_id).await {
            Ok(status) => status.likes,
            Err(e) => {
                warn!(error = %e, %post_id, "like lookup failed");
                LikeTally::Unavailable
            }
        }
    }
}
